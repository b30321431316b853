//! Dispatcher that checks preconditions and submits atomic commits.

use std::sync::Arc;

use tracing::{info, warn};

use volhub_core::error::{AppError, ErrorKind};
use volhub_core::result::AppResult;
use volhub_core::traits::{Clock, RemoteStore};

use super::operation::MutationRequest;
use super::precondition::evaluate_all;

/// Submits mutation requests to the remote store.
#[derive(Clone)]
pub struct MutationDispatcher {
    /// Remote store client.
    store: Arc<dyn RemoteStore>,
    /// Time source for time-based preconditions.
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MutationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationDispatcher").finish_non_exhaustive()
    }
}

impl MutationDispatcher {
    /// Creates a new dispatcher.
    pub fn new(store: Arc<dyn RemoteStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Evaluate the request's preconditions without touching the store.
    pub fn check(&self, request: &MutationRequest) -> AppResult<()> {
        evaluate_all(&request.preconditions, self.clock.now()).inspect_err(|e| {
            info!(kind = %request.kind, error = %e, "Mutation precondition failed");
        })
    }

    /// Commit the request's writes as one atomic unit.
    pub async fn commit(&self, request: MutationRequest) -> AppResult<()> {
        let kind = request.kind;
        let writes = request.writes.len();

        match self.store.commit_atomic(request.writes).await {
            Ok(()) => {
                info!(%kind, writes, "Mutation committed");
                Ok(())
            }
            Err(e) => {
                warn!(%kind, writes, error = %e, "Mutation commit failed");
                Err(map_store_error(e))
            }
        }
    }

    /// Check, then commit.
    pub async fn submit(&self, request: MutationRequest) -> AppResult<()> {
        self.check(&request)?;
        self.commit(request).await
    }
}

/// Collapse store failures into the mutation error taxonomy.
fn map_store_error(err: AppError) -> AppError {
    match err.kind {
        ErrorKind::NotFound | ErrorKind::StoreCommitFailed => err,
        _ => AppError::commit_failed(format!("Commit failed: {}", err.message)),
    }
}
