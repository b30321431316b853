//! Cloneable handle to a running identity session.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use volhub_core::config::AppConfig;
use volhub_core::error::AppError;
use volhub_core::events::SessionEvent;
use volhub_core::result::AppResult;
use volhub_core::traits::{Clock, RemoteStore};
use volhub_core::types::{
    IdentityId, MembershipSet, OpportunityId, Query, TimeWindow, Write,
};
use volhub_entity::{AttendanceStatus, OpportunityDraft, Profile, RankedEntry, fields};
use volhub_service::{Identity, MutationDispatcher, SessionContext};

use super::command::SessionCommand;
use super::coordinator::{Coordinator, Listeners, read_profiles};
use super::snapshot::SessionSnapshot;
use crate::presence::PresentationHost;

struct SessionInner {
    identity: Identity,
    store: Arc<dyn RemoteStore>,
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// A live session for one identity.
///
/// All state lives in the session's coordination loop; handles only send
/// messages to it. Dropping every handle ends the session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.inner.identity)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Session {
    /// Sign in: make sure the profile exists, attach both listeners, and
    /// spawn the coordination loop.
    pub async fn start(
        store: Arc<dyn RemoteStore>,
        identity: Identity,
        config: Arc<AppConfig>,
        host: Arc<dyn PresentationHost>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let profile = ensure_profile(store.as_ref(), &identity).await?;

        let profile_sub = store
            .subscribe(Query::Document(Profile::reference(identity.id)))
            .await?;
        let opportunities_sub = store
            .subscribe(Query::collection(fields::OPPORTUNITIES))
            .await?;
        let mut listeners = Listeners::new(profile_sub, opportunities_sub);

        let (events, _) = broadcast::channel(config.sync.event_buffer.max(1));
        let (commands_tx, commands_rx) = mpsc::channel(config.sync.command_buffer.max(1));
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let ctx = SessionContext::new(identity.clone(), profile.role, clock.now());
        let dispatcher = MutationDispatcher::new(store.clone(), clock.clone());
        let mut coordinator = Coordinator::new(
            ctx,
            config,
            clock,
            store.clone(),
            dispatcher,
            host,
            completions_tx,
            events.clone(),
        );
        coordinator.prime(&mut listeners).await;

        let token = CancellationToken::new();
        let task = tokio::spawn(coordinator.run(
            commands_rx,
            completions_rx,
            listeners,
            token.clone(),
        ));

        info!(
            identity_id = %identity.id,
            anonymous = identity.anonymous,
            role = %profile.role,
            "Session started"
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                identity,
                store,
                commands: commands_tx,
                events,
                token,
                task: Mutex::new(Some(task)),
            }),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn identity_id(&self) -> IdentityId {
        self.inner.identity.id
    }

    /// Subscribe to state change events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_active(&self) -> bool {
        !self.inner.token.is_cancelled() && !self.inner.commands.is_closed()
    }

    /// Toggle a favorite. Returns the new membership bit once the
    /// optimistic write is applied; the commit completes later.
    pub async fn toggle_favorite(&self, opportunity_id: OpportunityId) -> AppResult<bool> {
        self.toggle(MembershipSet::Favorites, opportunity_id).await
    }

    /// Toggle an RSVP. Returns the new membership bit once the optimistic
    /// write is applied; the commit completes later.
    pub async fn toggle_rsvp(&self, opportunity_id: OpportunityId) -> AppResult<bool> {
        self.toggle(MembershipSet::Rsvp, opportunity_id).await
    }

    async fn toggle(&self, set: MembershipSet, member: OpportunityId) -> AppResult<bool> {
        self.request(|reply| SessionCommand::Toggle { set, member, reply })
            .await?
    }

    /// Set or clear an attendee's attendance status. Manager only.
    pub async fn record_attendance(
        &self,
        opportunity_id: OpportunityId,
        attendee: IdentityId,
        status: Option<AttendanceStatus>,
    ) -> AppResult<()> {
        self.request(|reply| SessionCommand::RecordAttendance {
            opportunity_id,
            attendee,
            status,
            reply,
        })
        .await?
    }

    /// Remove an attendee from an opportunity. Manager only.
    pub async fn manager_remove_attendee(
        &self,
        opportunity_id: OpportunityId,
        attendee: IdentityId,
    ) -> AppResult<()> {
        self.request(|reply| SessionCommand::RemoveAttendee {
            opportunity_id,
            attendee,
            reply,
        })
        .await?
    }

    pub async fn create_opportunity(&self, draft: OpportunityDraft) -> AppResult<OpportunityId> {
        self.request(|reply| SessionCommand::CreateOpportunity { draft, reply })
            .await?
    }

    pub async fn update_opportunity(
        &self,
        opportunity_id: OpportunityId,
        draft: OpportunityDraft,
    ) -> AppResult<()> {
        self.request(|reply| SessionCommand::UpdateOpportunity {
            opportunity_id,
            draft,
            reply,
        })
        .await?
    }

    pub async fn delete_opportunity(&self, opportunity_id: OpportunityId) -> AppResult<()> {
        self.request(|reply| SessionCommand::DeleteOpportunity {
            opportunity_id,
            reply,
        })
        .await?
    }

    /// Recompute the leaderboard for `window`.
    ///
    /// Profiles are read once for name resolution; if that read fails the
    /// board is still computed with fallback names.
    pub async fn compute_leaderboard(&self, window: TimeWindow) -> AppResult<Vec<RankedEntry>> {
        let profiles = match read_profiles(self.inner.store.as_ref()).await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!(error = %e, "Profile lookup failed; using fallback names");
                Vec::new()
            }
        };

        self.request(|reply| SessionCommand::ComputeLeaderboard {
            window,
            profiles,
            reply,
        })
        .await
    }

    /// Re-evaluate presence against the current time.
    pub async fn refresh_presence(&self) -> AppResult<()> {
        self.request(|reply| SessionCommand::RefreshPresence { reply })
            .await
    }

    /// Wait until every dispatched commit has completed.
    pub async fn flush(&self) -> AppResult<()> {
        self.request(|reply| SessionCommand::Flush { reply }).await
    }

    pub async fn snapshot(&self) -> AppResult<SessionSnapshot> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// End the session and wait for its loop to finish tearing down.
    pub async fn shutdown(&self) {
        self.inner.token.cancel();
        let task = self.inner.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(identity_id = %self.inner.identity.id, error = %e, "Session task failed");
            }
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> AppResult<T> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .commands
            .send(build(tx))
            .await
            .map_err(|_| session_ended())?;
        rx.await.map_err(|_| session_ended())
    }
}

fn session_ended() -> AppError {
    AppError::permission_denied("No active identity: the session has ended")
}

/// Read the identity's profile, creating it on first sign-in.
async fn ensure_profile(store: &dyn RemoteStore, identity: &Identity) -> AppResult<Profile> {
    let reference = Profile::reference(identity.id);
    let existing = store.get_once(&Query::Document(reference.clone())).await?;
    if let Some(doc) = existing.first() {
        return Profile::from_document(doc);
    }

    let profile = Profile::new(
        identity.id,
        identity.initial_role(),
        identity.display_name.clone().unwrap_or_default(),
    );
    let create = Write::Create {
        document: reference.clone(),
        fields: profile.to_fields(),
    };

    match store.commit_atomic(vec![create]).await {
        Ok(()) => {
            info!(identity_id = %identity.id, role = %profile.role, "Profile created");
            Ok(profile)
        }
        Err(e) => {
            // Another session may have created it first.
            let docs = store.get_once(&Query::Document(reference)).await?;
            docs.first()
                .map(Profile::from_document)
                .transpose()?
                .ok_or(e)
        }
    }
}
