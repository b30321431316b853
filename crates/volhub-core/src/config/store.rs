//! In-memory store configuration.

use serde::{Deserialize, Serialize};

/// Settings for the in-process document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Reject commits that would grow an attendee set beyond its capacity.
    #[serde(default = "default_true")]
    pub enforce_capacity: bool,
    /// Optional JSON seed file loaded at startup.
    #[serde(default)]
    pub seed_file: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enforce_capacity: true,
            seed_file: None,
        }
    }
}

fn default_true() -> bool {
    true
}
