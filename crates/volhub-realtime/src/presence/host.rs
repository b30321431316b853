//! Presentation host seam.
//!
//! The host renders ephemeral presentations (a lock-screen activity, a
//! notification, a terminal banner). Rendering lives outside this crate;
//! the session only tells the host what to show.

use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use tracing::info;

use volhub_core::types::OpportunityId;

use super::state::PresenceState;
use super::trigger::{PresenceAction, PresentationSpec};

/// Receives presentation lifecycle calls.
pub trait PresentationHost: Send + Sync + 'static {
    /// Show a new presentation.
    fn start(&self, spec: &PresentationSpec, state: PresenceState);
    /// Change the sub-state of a shown presentation.
    fn update(&self, opportunity_id: OpportunityId, state: PresenceState);
    /// Remove a presentation.
    fn end(&self, opportunity_id: OpportunityId, state: PresenceState);
}

/// Apply trigger actions to a host, in order.
pub fn apply_actions(host: &dyn PresentationHost, actions: &[PresenceAction]) {
    for action in actions {
        match action {
            PresenceAction::Start { spec, state } => host.start(spec, *state),
            PresenceAction::Update {
                opportunity_id,
                state,
            } => host.update(*opportunity_id, *state),
            PresenceAction::End {
                opportunity_id,
                state,
            } => host.end(*opportunity_id, *state),
        }
    }
}

/// Host that only logs.
#[derive(Debug, Default)]
pub struct TracingHost;

impl PresentationHost for TracingHost {
    fn start(&self, spec: &PresentationSpec, state: PresenceState) {
        info!(
            opportunity_id = %spec.opportunity_id,
            name = %spec.name,
            %state,
            "Presentation started"
        );
    }

    fn update(&self, opportunity_id: OpportunityId, state: PresenceState) {
        info!(%opportunity_id, %state, "Presentation updated");
    }

    fn end(&self, opportunity_id: OpportunityId, state: PresenceState) {
        info!(%opportunity_id, %state, "Presentation ended");
    }
}

/// One call received by a [`RecordingHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Start(OpportunityId, String, PresenceState),
    Update(OpportunityId, PresenceState),
    End(OpportunityId, PresenceState),
}

/// Host that records every call and the currently shown presentations.
#[derive(Debug, Default)]
pub struct RecordingHost {
    /// Opportunity ID → shown state
    shown: DashMap<OpportunityId, PresenceState>,
    /// Calls in arrival order
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently shown state of a presentation.
    pub fn shown(&self, opportunity_id: OpportunityId) -> Option<PresenceState> {
        self.shown.get(&opportunity_id).map(|r| *r.value())
    }

    /// Number of shown presentations.
    pub fn shown_count(&self) -> usize {
        self.shown.len()
    }

    /// Every call so far.
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: HostCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl PresentationHost for RecordingHost {
    fn start(&self, spec: &PresentationSpec, state: PresenceState) {
        self.shown.insert(spec.opportunity_id, state);
        self.record(HostCall::Start(spec.opportunity_id, spec.name.clone(), state));
    }

    fn update(&self, opportunity_id: OpportunityId, state: PresenceState) {
        self.shown.insert(opportunity_id, state);
        self.record(HostCall::Update(opportunity_id, state));
    }

    fn end(&self, opportunity_id: OpportunityId, state: PresenceState) {
        self.shown.remove(&opportunity_id);
        self.record(HostCall::End(opportunity_id, state));
    }
}
