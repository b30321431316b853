//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so an empty file is a
//! valid configuration.

pub mod leaderboard;
pub mod logging;
pub mod presence;
pub mod store;
pub mod sync;

use serde::{Deserialize, Serialize};

pub use self::leaderboard::LeaderboardConfig;
pub use self::logging::LoggingConfig;
pub use self::presence::PresenceConfig;
pub use self::store::StoreConfig;
pub use self::sync::SyncConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session synchronization settings.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Presence trigger settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Leaderboard aggregation settings.
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    /// In-memory store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the base file at `path` with an environment-specific overlay
    /// `config/{env}.toml` and environment variables prefixed with `VOLHUB__`.
    /// Missing files are skipped.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("VOLHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
