//! Session-level state change events.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::types::category::{ErrorCategory, MembershipSet};
use crate::types::id::{IdentityId, OpportunityId};
use crate::types::window::TimeWindow;

/// Why a membership bit changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    /// Applied locally before the remote commit.
    Optimistic,
    /// Restored to the pre-toggle value after a failed commit.
    Reverted,
    /// Delivered by the change stream.
    Authoritative,
}

/// Events describing state changes inside one identity session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// One member of a set flipped.
    MembershipChanged {
        /// The set.
        set: MembershipSet,
        /// The opportunity whose membership changed.
        member: OpportunityId,
        /// The new membership bit.
        is_member: bool,
        /// What caused the change.
        cause: ChangeCause,
    },
    /// A commit for a toggle landed; the optimistic value stands.
    ToggleConfirmed {
        /// The set.
        set: MembershipSet,
        /// The toggled opportunity.
        member: OpportunityId,
    },
    /// The opportunity cache was replaced by a listener delivery.
    OpportunitiesReplaced {
        /// Number of opportunities now cached.
        count: usize,
    },
    /// The session's effective role changed.
    RoleChanged {
        /// New role, lowercase.
        role: String,
    },
    /// An error was surfaced in a category.
    ErrorSurfaced {
        /// The category.
        category: ErrorCategory,
        /// The error kind.
        kind: ErrorKind,
        /// Human-readable message.
        message: String,
    },
    /// A category's error was cleared (expiry or later success).
    ErrorCleared {
        /// The category.
        category: ErrorCategory,
    },
    /// A presentation's displayed sub-state changed.
    PresenceChanged {
        /// The opportunity.
        opportunity_id: OpportunityId,
        /// New state, lowercase.
        state: String,
    },
    /// A leaderboard was recomputed.
    LeaderboardUpdated {
        /// The filter used.
        window: TimeWindow,
        /// Number of ranked entries.
        entries: usize,
    },
    /// The session shut down; all derived state was cleared.
    SessionEnded {
        /// The identity whose session ended.
        identity_id: IdentityId,
    },
}
