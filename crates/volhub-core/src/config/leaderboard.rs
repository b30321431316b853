//! Leaderboard aggregation configuration.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Settings for hour aggregation and name resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Offset from UTC, in minutes, used to anchor calendar month/year windows.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Number of id characters used to build a fallback display name.
    #[serde(default = "default_fallback_prefix_len")]
    pub fallback_prefix_len: usize,
}

impl LeaderboardConfig {
    /// The calendar offset. Out-of-range values fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            fallback_prefix_len: default_fallback_prefix_len(),
        }
    }
}

fn default_fallback_prefix_len() -> usize {
    6
}
