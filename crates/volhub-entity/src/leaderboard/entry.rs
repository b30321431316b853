//! Ranked leaderboard entry.

use serde::{Deserialize, Serialize};

use volhub_core::types::IdentityId;

/// One row of a computed leaderboard. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// The ranked identity.
    pub identity_id: IdentityId,
    /// Resolved display name.
    pub display_name: String,
    /// Accumulated present time in whole seconds. Ranking compares this.
    pub seconds: i64,
    /// `seconds` expressed in hours, always positive for emitted rows.
    pub hours: f64,
    /// 1-based competition rank; `None` until assigned.
    pub rank: Option<u32>,
}

impl RankedEntry {
    /// An unranked entry for `seconds` of present time.
    pub fn new(identity_id: IdentityId, display_name: impl Into<String>, seconds: i64) -> Self {
        Self {
            identity_id,
            display_name: display_name.into(),
            seconds,
            hours: seconds as f64 / 3600.0,
            rank: None,
        }
    }
}
