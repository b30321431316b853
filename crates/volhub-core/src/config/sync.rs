//! Session synchronization configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the per-identity coordination loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds a surfaced error stays visible before it auto-expires.
    #[serde(default = "default_error_display")]
    pub error_display_seconds: u64,
    /// Capacity of the coordinator's command inbox.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    /// Capacity of the session event broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl SyncConfig {
    /// The auto-expiry delay as a [`Duration`].
    pub fn error_display(&self) -> Duration {
        Duration::from_secs(self.error_display_seconds)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            error_display_seconds: default_error_display(),
            command_buffer: default_command_buffer(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_error_display() -> u64 {
    4
}

fn default_command_buffer() -> usize {
    64
}

fn default_event_buffer() -> usize {
    256
}
