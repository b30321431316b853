//! Session manager: holds at most one live session and switches identity.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use volhub_core::config::AppConfig;
use volhub_core::result::AppResult;
use volhub_core::traits::{Clock, RemoteStore};
use volhub_service::Identity;

use super::handle::Session;
use crate::presence::PresentationHost;

/// Owns the current identity session.
///
/// Switching identity fully tears down the previous session (listeners
/// cancelled, presentations ended, state cleared) before the next one
/// starts, so no state crosses identities.
pub struct SessionManager {
    store: Arc<dyn RemoteStore>,
    config: Arc<AppConfig>,
    host: Arc<dyn PresentationHost>,
    clock: Arc<dyn Clock>,
    current: Mutex<Option<Session>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        config: Arc<AppConfig>,
        host: Arc<dyn PresentationHost>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            config,
            host,
            clock,
            current: Mutex::new(None),
        }
    }

    /// End the current session, if any, and start one for `identity`.
    pub async fn switch_identity(&self, identity: Identity) -> AppResult<Session> {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            info!(
                from = %previous.identity_id(),
                to = %identity.id,
                "Switching identity"
            );
            previous.shutdown().await;
        }

        let session = Session::start(
            self.store.clone(),
            identity,
            self.config.clone(),
            self.host.clone(),
            self.clock.clone(),
        )
        .await?;
        *current = Some(session.clone());
        Ok(session)
    }

    /// End the current session.
    pub async fn sign_out(&self) {
        if let Some(session) = self.current.lock().await.take() {
            session.shutdown().await;
        }
    }

    /// The live session, if any.
    pub async fn current(&self) -> Option<Session> {
        self.current.lock().await.clone()
    }
}
