//! Presence trigger configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing of the per-opportunity presence state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Minutes before start during which an opportunity is "starting soon".
    #[serde(default = "default_lead_window")]
    pub lead_window_minutes: i64,
    /// Seconds between periodic re-evaluations.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
}

impl PresenceConfig {
    /// The lead window as a chrono duration.
    pub fn lead_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lead_window_minutes)
    }

    /// The refresh period as a std duration.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds.max(1))
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            lead_window_minutes: default_lead_window(),
            refresh_interval_seconds: default_refresh_interval(),
        }
    }
}

fn default_lead_window() -> i64 {
    30
}

fn default_refresh_interval() -> u64 {
    60
}
