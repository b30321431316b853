//! Presence state definitions.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Displayed sub-state of an opportunity's presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    /// No presentation.
    Inactive,
    /// Start is further away than the lead window.
    Upcoming,
    /// Start is within the lead window.
    StartingSoon,
    /// Between start and end, inclusive.
    Ongoing,
    /// Past the end. Terminal.
    Ended,
}

impl PresenceState {
    /// The state an active presentation should display at `now`.
    pub fn at(
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        lead_window: Duration,
    ) -> Self {
        if now > end {
            Self::Ended
        } else if now >= start {
            Self::Ongoing
        } else if start - now <= lead_window {
            Self::StartingSoon
        } else {
            Self::Upcoming
        }
    }

    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Upcoming => "upcoming",
            Self::StartingSoon => "starting_soon",
            Self::Ongoing => "ongoing",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
