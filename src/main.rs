//! VolHub session runner.
//!
//! Loads configuration, seeds an in-memory store, signs in one identity,
//! and logs every session event until Ctrl+C or SIGTERM.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, fmt};

use volhub_core::config::AppConfig;
use volhub_core::error::AppError;
use volhub_core::events::SessionEvent;
use volhub_core::traits::SystemClock;
use volhub_core::types::{IdentityId, TimeWindow};
use volhub_realtime::{SessionManager, TracingHost};
use volhub_service::Identity;
use volhub_store::MemoryStore;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Session error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("VOLHUB_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("VOLHUB_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Identity to sign in as: first argument, then `VOLHUB_IDENTITY`, else a
/// fresh anonymous identity.
fn resolve_identity() -> Result<Identity, AppError> {
    let raw = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VOLHUB_IDENTITY").ok());

    match raw {
        Some(raw) => {
            let id: IdentityId = raw
                .parse()
                .map_err(|e| AppError::validation(format!("Invalid identity id '{raw}': {e}")))?;
            Ok(Identity {
                id,
                anonymous: false,
                display_name: None,
            })
        }
        None => Ok(Identity::anonymous(IdentityId::new())),
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting VolHub v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(MemoryStore::new(&config.store));
    if let Some(seed) = &config.store.seed_file {
        store.seed_from_file(seed).await?;
    } else {
        tracing::warn!("No seed file configured; starting from an empty store");
    }

    let config = Arc::new(config);
    let manager = SessionManager::new(
        store.clone(),
        config.clone(),
        Arc::new(TracingHost),
        Arc::new(SystemClock),
    );

    let identity = resolve_identity()?;
    let session = manager.switch_identity(identity).await?;
    let mut events = session.events();

    let snapshot = session.snapshot().await?;
    tracing::info!(
        identity_id = %snapshot.identity_id,
        role = %snapshot.role,
        opportunities = snapshot.opportunities.len(),
        rsvps = snapshot.rsvps.len(),
        favorites = snapshot.favorites.len(),
        "Signed in"
    );

    let board = session.compute_leaderboard(TimeWindow::Month).await?;
    for entry in board.iter().take(5) {
        tracing::info!(
            rank = entry.rank.unwrap_or_default(),
            name = %entry.display_name,
            hours = entry.hours,
            "Leaderboard"
        );
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::SessionEnded { .. }) | Err(RecvError::Closed) => break,
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session event stream lagged");
                }
            },
        }
    }

    manager.sign_out().await;
    tracing::info!("VolHub stopped");
    Ok(())
}

fn log_event(event: &SessionEvent) {
    match serde_json::to_string(event) {
        Ok(json) => tracing::info!(event = %json, "Session event"),
        Err(_) => tracing::info!(?event, "Session event"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
