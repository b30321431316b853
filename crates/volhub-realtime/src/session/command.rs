//! Messages handled by the session coordinator loop.

use tokio::sync::oneshot;

use volhub_core::result::AppResult;
use volhub_core::types::{IdentityId, MembershipSet, OpportunityId, TimeWindow};
use volhub_entity::{AttendanceStatus, OpportunityDraft, Profile, RankedEntry};
use volhub_service::alerts::ExpiryTicket;
use volhub_service::membership::PendingToggle;

use super::snapshot::SessionSnapshot;

/// Requests sent by [`Session`](super::Session) handles.
#[derive(Debug)]
pub enum SessionCommand {
    /// Optimistically toggle a membership bit; replies with the new bit.
    Toggle {
        set: MembershipSet,
        member: OpportunityId,
        reply: oneshot::Sender<AppResult<bool>>,
    },
    RecordAttendance {
        opportunity_id: OpportunityId,
        attendee: IdentityId,
        status: Option<AttendanceStatus>,
        reply: oneshot::Sender<AppResult<()>>,
    },
    RemoveAttendee {
        opportunity_id: OpportunityId,
        attendee: IdentityId,
        reply: oneshot::Sender<AppResult<()>>,
    },
    CreateOpportunity {
        draft: OpportunityDraft,
        reply: oneshot::Sender<AppResult<OpportunityId>>,
    },
    UpdateOpportunity {
        opportunity_id: OpportunityId,
        draft: OpportunityDraft,
        reply: oneshot::Sender<AppResult<()>>,
    },
    DeleteOpportunity {
        opportunity_id: OpportunityId,
        reply: oneshot::Sender<AppResult<()>>,
    },
    /// Recompute the leaderboard with freshly read profiles.
    ComputeLeaderboard {
        window: TimeWindow,
        profiles: Vec<Profile>,
        reply: oneshot::Sender<Vec<RankedEntry>>,
    },
    /// Re-evaluate presence now instead of waiting for the next tick.
    RefreshPresence { reply: oneshot::Sender<()> },
    /// Reply once no commit is in flight or queued.
    Flush { reply: oneshot::Sender<()> },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Completions fed back into the loop by spawned tasks.
#[derive(Debug)]
pub(crate) enum Completion {
    /// A toggle's commit finished.
    Toggle {
        toggle: PendingToggle,
        result: AppResult<()>,
    },
    /// An awaited mutation's commit finished.
    Mutation {
        kind: volhub_service::MutationKind,
        result: AppResult<()>,
        reply: MutationReply,
    },
    /// A background profile read finished.
    ProfilesRefreshed(AppResult<Vec<Profile>>),
    /// A surfaced error's display time elapsed.
    ErrorExpired(ExpiryTicket),
}

/// Where to deliver an awaited mutation's outcome.
#[derive(Debug)]
pub(crate) enum MutationReply {
    Unit(oneshot::Sender<AppResult<()>>),
    Created(OpportunityId, oneshot::Sender<AppResult<OpportunityId>>),
}

impl MutationReply {
    pub(crate) fn send(self, result: AppResult<()>) {
        match self {
            Self::Unit(reply) => {
                let _ = reply.send(result);
            }
            Self::Created(id, reply) => {
                let _ = reply.send(result.map(|()| id));
            }
        }
    }
}
