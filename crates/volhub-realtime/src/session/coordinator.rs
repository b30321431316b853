//! The per-identity coordination loop.
//!
//! One task owns every piece of mutable session state: membership sets,
//! the opportunity cache, the error board, presence, and the last
//! leaderboard. Commands from handles, commit completions, listener
//! snapshots, and the refresh tick all arrive as messages and are applied
//! one at a time. Handlers never await; remote commits run in spawned
//! tasks that report back through the completion channel.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use volhub_core::config::AppConfig;
use volhub_core::error::AppError;
use volhub_core::events::SessionEvent;
use volhub_core::result::AppResult;
use volhub_core::traits::{Clock, RemoteStore, SnapshotEvent, Subscription};
use volhub_core::types::{ErrorCategory, MembershipSet, OpportunityId, Query, TimeWindow};
use volhub_entity::{Opportunity, Profile, RankedEntry, UserRole, fields};
use volhub_service::dispatch::writes;
use volhub_service::{
    ErrorBoard, MembershipDiff, MembershipSynchronizer, MutationDispatcher, MutationRequest,
    PendingToggle, SessionContext, compute_leaderboard,
};

use super::command::{Completion, MutationReply, SessionCommand};
use super::snapshot::SessionSnapshot;
use crate::presence::{PresenceTrigger, PresentationHost, apply_actions};

type ToggleKey = (MembershipSet, OpportunityId);

/// The two change streams a session listens to.
pub(crate) struct Listeners {
    pub(crate) profile: Subscription,
    pub(crate) opportunities: Subscription,
    profile_open: bool,
    opportunities_open: bool,
}

impl Listeners {
    pub(crate) fn new(profile: Subscription, opportunities: Subscription) -> Self {
        Self {
            profile,
            opportunities,
            profile_open: true,
            opportunities_open: true,
        }
    }

    fn cancel(&self) {
        self.profile.handle.cancel();
        self.opportunities.handle.cancel();
    }
}

/// Session state plus everything needed to act on it.
pub(crate) struct Coordinator {
    ctx: SessionContext,
    config: Arc<AppConfig>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn RemoteStore>,
    dispatcher: MutationDispatcher,
    host: Arc<dyn PresentationHost>,
    membership: MembershipSynchronizer,
    opportunities: BTreeMap<OpportunityId, Opportunity>,
    errors: ErrorBoard,
    presence: PresenceTrigger,
    leaderboard: Option<(TimeWindow, Vec<RankedEntry>)>,
    /// Profiles used for the last leaderboard's name resolution.
    profiles: Vec<Profile>,
    /// A background profile read is in flight.
    refreshing_profiles: bool,
    /// Toggle keys with a commit in flight.
    in_flight: HashSet<ToggleKey>,
    /// Toggles waiting for the in-flight commit on the same key.
    waiting: HashMap<ToggleKey, VecDeque<(PendingToggle, MutationRequest)>>,
    /// Awaited mutations with a commit in flight.
    in_flight_mutations: usize,
    flush_waiters: Vec<oneshot::Sender<()>>,
    completions: mpsc::UnboundedSender<Completion>,
    events: broadcast::Sender<SessionEvent>,
}

impl Coordinator {
    pub(crate) fn new(
        ctx: SessionContext,
        config: Arc<AppConfig>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn RemoteStore>,
        dispatcher: MutationDispatcher,
        host: Arc<dyn PresentationHost>,
        completions: mpsc::UnboundedSender<Completion>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let presence = PresenceTrigger::new(config.presence.lead_window());
        Self {
            ctx,
            config,
            clock,
            store,
            dispatcher,
            host,
            membership: MembershipSynchronizer::new(),
            opportunities: BTreeMap::new(),
            errors: ErrorBoard::new(),
            presence,
            leaderboard: None,
            profiles: Vec::new(),
            refreshing_profiles: false,
            in_flight: HashSet::new(),
            waiting: HashMap::new(),
            in_flight_mutations: 0,
            flush_waiters: Vec::new(),
            completions,
            events,
        }
    }

    /// Apply the initial snapshot of both listeners before serving commands.
    pub(crate) async fn prime(&mut self, listeners: &mut Listeners) {
        let profile = listeners.profile.snapshots.recv().await;
        listeners.profile_open = self.on_profile_event(profile);
        let opportunities = listeners.opportunities.snapshots.recv().await;
        listeners.opportunities_open = self.on_opportunities_event(opportunities);
    }

    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        mut listeners: Listeners,
        token: CancellationToken,
    ) {
        let mut ticker = time::interval(self.config.presence.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                event = listeners.profile.snapshots.recv(), if listeners.profile_open => {
                    listeners.profile_open = self.on_profile_event(event);
                }
                event = listeners.opportunities.snapshots.recv(), if listeners.opportunities_open => {
                    listeners.opportunities_open = self.on_opportunities_event(event);
                }
                _ = ticker.tick() => self.reevaluate_presence(),
            }
        }

        listeners.cancel();
        self.teardown();
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Toggle { set, member, reply } => {
                let result = self.toggle(set, member);
                let _ = reply.send(result);
            }
            SessionCommand::RecordAttendance {
                opportunity_id,
                attendee,
                status,
                reply,
            } => {
                let request = self
                    .opportunity(opportunity_id)
                    .map(|opp| writes::attendance(&self.ctx, opp, attendee, status));
                self.dispatch_awaited(
                    ErrorCategory::Attendance,
                    request,
                    MutationReply::Unit(reply),
                );
            }
            SessionCommand::RemoveAttendee {
                opportunity_id,
                attendee,
                reply,
            } => {
                let request = self
                    .opportunity(opportunity_id)
                    .map(|opp| writes::manager_removal(&self.ctx, opp, attendee));
                self.dispatch_awaited(ErrorCategory::Removal, request, MutationReply::Unit(reply));
            }
            SessionCommand::CreateOpportunity { draft, reply } => {
                let id = OpportunityId::new();
                let request = writes::create_opportunity(&self.ctx, id, draft);
                self.dispatch_awaited(
                    ErrorCategory::General,
                    request,
                    MutationReply::Created(id, reply),
                );
            }
            SessionCommand::UpdateOpportunity {
                opportunity_id,
                draft,
                reply,
            } => {
                let request = self
                    .opportunity(opportunity_id)
                    .and_then(|opp| writes::update_opportunity(&self.ctx, opp, draft));
                self.dispatch_awaited(ErrorCategory::General, request, MutationReply::Unit(reply));
            }
            SessionCommand::DeleteOpportunity {
                opportunity_id,
                reply,
            } => {
                let request = self
                    .opportunity(opportunity_id)
                    .map(|opp| writes::delete_opportunity(&self.ctx, opp));
                self.dispatch_awaited(ErrorCategory::General, request, MutationReply::Unit(reply));
            }
            SessionCommand::ComputeLeaderboard {
                window,
                profiles,
                reply,
            } => {
                self.profiles = profiles;
                let _ = reply.send(self.compute_leaderboard(window));
            }
            SessionCommand::RefreshPresence { reply } => {
                self.reevaluate_presence();
                let _ = reply.send(());
            }
            SessionCommand::Flush { reply } => {
                self.flush_waiters.push(reply);
                self.notify_flush_waiters();
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Toggle { toggle, result } => self.finish_toggle(toggle, result),
            Completion::Mutation {
                kind,
                result,
                reply,
            } => {
                self.in_flight_mutations = self.in_flight_mutations.saturating_sub(1);
                match &result {
                    Ok(()) => self.clear_error(kind.category()),
                    Err(e) => self.surface(kind.category(), e),
                }
                reply.send(result);
                self.notify_flush_waiters();
            }
            Completion::ProfilesRefreshed(result) => {
                self.refreshing_profiles = false;
                match result {
                    Ok(profiles) => {
                        self.profiles = profiles;
                        if let Some(window) = self.leaderboard.as_ref().map(|(w, _)| *w) {
                            self.compute_leaderboard(window);
                        }
                    }
                    Err(e) => warn!(error = %e, "Profile refresh failed; keeping cached names"),
                }
            }
            Completion::ErrorExpired(ticket) => {
                if self.errors.expire(ticket) {
                    self.emit(SessionEvent::ErrorCleared {
                        category: ticket.category,
                    });
                }
            }
        }
    }

    // ── Toggles ─────────────────────────────────────────────────────

    fn toggle(&mut self, set: MembershipSet, member: OpportunityId) -> Result<bool, AppError> {
        let category = toggle_category(set);
        let adding = !self.membership.is_member(set, member);

        let request = match set {
            MembershipSet::Favorites => writes::favorite(&self.ctx, member, adding),
            MembershipSet::Rsvp => match self.opportunity(member) {
                Ok(opp) => writes::rsvp(&self.ctx, opp, adding),
                Err(e) => return Err(self.reject(category, e)),
            },
        };
        if let Err(e) = self.dispatcher.check(&request) {
            return Err(self.reject(category, e));
        }

        let (toggle, diff) = self.membership.begin_toggle(set, member);
        self.emit_diff(diff);
        info!(
            identity_id = %self.ctx.identity_id(),
            %set,
            %member,
            adding,
            "Toggle dispatched"
        );

        let key = (set, member);
        if self.in_flight.insert(key) {
            self.spawn_toggle_commit(toggle, request);
        } else {
            debug!(%set, %member, "Toggle queued behind in-flight commit");
            self.waiting
                .entry(key)
                .or_default()
                .push_back((toggle, request));
        }

        self.reevaluate_presence();
        Ok(!toggle.was_member)
    }

    fn finish_toggle(&mut self, toggle: PendingToggle, result: Result<(), AppError>) {
        let category = toggle_category(toggle.set);
        match result {
            Ok(()) => {
                self.membership.confirm(&toggle);
                self.clear_error(category);
                self.emit(SessionEvent::ToggleConfirmed {
                    set: toggle.set,
                    member: toggle.member,
                });
            }
            Err(e) => {
                let diff = self.membership.revert(&toggle);
                self.emit_diff(diff);
                self.surface(category, &e);
            }
        }

        let key = (toggle.set, toggle.member);
        match self.waiting.get_mut(&key).and_then(|queue| queue.pop_front()) {
            Some((next, request)) => self.spawn_toggle_commit(next, request),
            None => {
                self.waiting.remove(&key);
                self.in_flight.remove(&key);
            }
        }

        self.reevaluate_presence();
        self.notify_flush_waiters();
    }

    fn spawn_toggle_commit(&self, toggle: PendingToggle, request: MutationRequest) {
        let dispatcher = self.dispatcher.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = dispatcher.commit(request).await;
            let _ = completions.send(Completion::Toggle { toggle, result });
        });
    }

    // ── Awaited mutations ───────────────────────────────────────────

    fn dispatch_awaited(
        &mut self,
        category: ErrorCategory,
        request: Result<MutationRequest, AppError>,
        reply: MutationReply,
    ) {
        let request = match request.and_then(|r| self.dispatcher.check(&r).map(|()| r)) {
            Ok(request) => request,
            Err(e) => {
                let e = self.reject(category, e);
                reply.send(Err(e));
                return;
            }
        };

        self.in_flight_mutations += 1;
        let kind = request.kind;
        let dispatcher = self.dispatcher.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = dispatcher.commit(request).await;
            let _ = completions.send(Completion::Mutation {
                kind,
                result,
                reply,
            });
        });
    }

    // ── Listeners ───────────────────────────────────────────────────

    /// Returns whether the profile stream is still open.
    fn on_profile_event(&mut self, event: Option<SnapshotEvent>) -> bool {
        match event {
            Some(Ok(docs)) => {
                match docs.first().map(Profile::from_document) {
                    Some(Ok(profile)) => self.apply_profile(profile),
                    Some(Err(e)) => self.profile_listener_failed(&e),
                    None => {
                        // Deleted profile: the identity can no longer act.
                        self.ctx.active = false;
                        self.profile_listener_failed(&AppError::not_found(
                            "Profile document disappeared",
                        ));
                    }
                }
                true
            }
            Some(Err(e)) => {
                self.profile_listener_failed(&e);
                true
            }
            None => {
                self.profile_listener_failed(&AppError::subscription("Profile stream closed"));
                false
            }
        }
    }

    fn apply_profile(&mut self, profile: Profile) {
        self.ctx.active = true;
        self.set_role(profile.role);
        for diff in self.membership.apply_profile(&profile) {
            self.emit_diff(diff);
        }
        self.reevaluate_presence();
    }

    fn profile_listener_failed(&mut self, error: &AppError) {
        warn!(
            identity_id = %self.ctx.identity_id(),
            error = %error,
            "Profile listener failed; degrading role"
        );
        self.set_role(UserRole::Anonymous);
    }

    /// Returns whether the opportunities stream is still open.
    fn on_opportunities_event(&mut self, event: Option<SnapshotEvent>) -> bool {
        match event {
            Some(Ok(docs)) => {
                let mut opportunities = BTreeMap::new();
                for doc in &docs {
                    match Opportunity::from_document(doc) {
                        Ok(opp) => {
                            opportunities.insert(opp.id, opp);
                        }
                        Err(e) => {
                            warn!(
                                document = %doc.reference,
                                error = %e,
                                "Skipping malformed opportunity"
                            )
                        }
                    }
                }
                self.opportunities = opportunities;
                self.emit(SessionEvent::OpportunitiesReplaced {
                    count: self.opportunities.len(),
                });
                self.reevaluate_presence();
                if let Some(window) = self.leaderboard.as_ref().map(|(w, _)| *w) {
                    self.compute_leaderboard(window);
                    self.spawn_profile_refresh();
                }
                true
            }
            Some(Err(e)) => {
                self.opportunities_listener_failed(e);
                true
            }
            None => {
                self.opportunities_listener_failed(AppError::subscription(
                    "Opportunities stream closed",
                ));
                false
            }
        }
    }

    fn opportunities_listener_failed(&mut self, error: AppError) {
        warn!(error = %error, "Opportunities listener failed; keeping last known list");
        self.surface(ErrorCategory::General, &error);
    }

    // ── Derived state ───────────────────────────────────────────────

    fn reevaluate_presence(&mut self) {
        let rsvp = self.membership.members(MembershipSet::Rsvp);
        let actions = self
            .presence
            .evaluate(&self.opportunities, &rsvp, self.clock.now());
        if actions.is_empty() {
            return;
        }

        apply_actions(self.host.as_ref(), &actions);
        for action in actions {
            self.emit(SessionEvent::PresenceChanged {
                opportunity_id: action.opportunity_id(),
                state: action.state().as_str().to_string(),
            });
        }
    }

    fn compute_leaderboard(&mut self, window: TimeWindow) -> Vec<RankedEntry> {
        let opportunities: Vec<Opportunity> = self.opportunities.values().cloned().collect();
        let entries = compute_leaderboard(
            &opportunities,
            &self.profiles,
            window,
            self.clock.now(),
            &self.config.leaderboard,
        );
        self.emit(SessionEvent::LeaderboardUpdated {
            window,
            entries: entries.len(),
        });
        self.leaderboard = Some((window, entries.clone()));
        entries
    }

    /// Re-read profiles so names of newly joined volunteers resolve; the
    /// board is recomputed again when the read lands.
    fn spawn_profile_refresh(&mut self) {
        if self.refreshing_profiles {
            return;
        }
        self.refreshing_profiles = true;
        let store = self.store.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = read_profiles(store.as_ref()).await;
            let _ = completions.send(Completion::ProfilesRefreshed(result));
        });
    }

    fn snapshot(&self) -> SessionSnapshot {
        let mut opportunities: Vec<Opportunity> = self.opportunities.values().cloned().collect();
        opportunities.sort_by_key(|o| (o.start, o.id));

        SessionSnapshot {
            identity_id: self.ctx.identity_id(),
            role: self.ctx.role,
            opportunities,
            favorites: self.membership.members(MembershipSet::Favorites),
            rsvps: self.membership.members(MembershipSet::Rsvp),
            leaderboard: self.leaderboard.clone(),
            errors: self.errors.all(),
            presence: self.presence.states(),
            pending_toggles: self.membership.pending_count(),
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn opportunity(&self, id: OpportunityId) -> Result<&Opportunity, AppError> {
        self.opportunities
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Opportunity {id} not found")))
    }

    fn set_role(&mut self, role: UserRole) {
        if self.ctx.role == role {
            return;
        }
        info!(
            identity_id = %self.ctx.identity_id(),
            from = %self.ctx.role,
            to = %role,
            "Role changed"
        );
        self.ctx.role = role;
        self.emit(SessionEvent::RoleChanged {
            role: role.as_str().to_string(),
        });
    }

    /// Surface a pre-dispatch failure and hand it back to the caller.
    fn reject(&mut self, category: ErrorCategory, error: AppError) -> AppError {
        self.surface(category, &error);
        error
    }

    fn surface(&mut self, category: ErrorCategory, error: &AppError) {
        let ticket = self.errors.surface(category, error, self.clock.now());
        warn!(%category, kind = %error.kind, message = %error.message, "Error surfaced");
        self.emit(SessionEvent::ErrorSurfaced {
            category,
            kind: error.kind,
            message: error.message.clone(),
        });

        let delay = self.config.sync.error_display();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = completions.send(Completion::ErrorExpired(ticket));
        });
    }

    fn clear_error(&mut self, category: ErrorCategory) {
        if self.errors.clear(category) {
            self.emit(SessionEvent::ErrorCleared { category });
        }
    }

    fn emit_diff(&self, diff: MembershipDiff) {
        for event in diff.into_events() {
            self.emit(event);
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.in_flight_mutations == 0
    }

    fn notify_flush_waiters(&mut self) {
        if !self.is_idle() {
            return;
        }
        for waiter in self.flush_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn teardown(&mut self) {
        let actions = self.presence.end_all();
        apply_actions(self.host.as_ref(), &actions);

        self.membership.clear();
        self.opportunities.clear();
        self.errors.clear_all();
        self.leaderboard = None;
        self.profiles.clear();
        self.waiting.clear();
        self.in_flight.clear();
        self.in_flight_mutations = 0;
        self.ctx.active = false;
        self.notify_flush_waiters();

        let identity_id = self.ctx.identity_id();
        self.emit(SessionEvent::SessionEnded { identity_id });
        info!(%identity_id, presentations_ended = actions.len(), "Session ended");
    }
}

fn toggle_category(set: MembershipSet) -> ErrorCategory {
    match set {
        MembershipSet::Favorites => ErrorCategory::General,
        MembershipSet::Rsvp => ErrorCategory::Rsvp,
    }
}

/// Read every decodable profile for leaderboard name resolution.
pub(crate) async fn read_profiles(store: &dyn RemoteStore) -> AppResult<Vec<Profile>> {
    let docs = store.get_once(&Query::collection(fields::USERS)).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| Profile::from_document(doc).ok())
        .collect())
}
