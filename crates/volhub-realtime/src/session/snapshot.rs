//! Read-only view of a session's state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use volhub_core::types::{ErrorCategory, IdentityId, OpportunityId, TimeWindow};
use volhub_entity::{Opportunity, RankedEntry, UserRole};
use volhub_service::alerts::SurfacedError;

use crate::presence::PresenceState;

/// Point-in-time copy of everything a UI would render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub identity_id: IdentityId,
    pub role: UserRole,
    /// Opportunities sorted by start instant.
    pub opportunities: Vec<Opportunity>,
    pub favorites: BTreeSet<OpportunityId>,
    pub rsvps: BTreeSet<OpportunityId>,
    /// Last computed leaderboard and its window.
    pub leaderboard: Option<(TimeWindow, Vec<RankedEntry>)>,
    pub errors: BTreeMap<ErrorCategory, SurfacedError>,
    pub presence: BTreeMap<OpportunityId, PresenceState>,
    /// Toggles whose commit has not completed.
    pub pending_toggles: usize,
}

impl SessionSnapshot {
    pub fn opportunity(&self, id: OpportunityId) -> Option<&Opportunity> {
        self.opportunities.iter().find(|o| o.id == id)
    }

    pub fn error(&self, category: ErrorCategory) -> Option<&SurfacedError> {
        self.errors.get(&category)
    }
}
