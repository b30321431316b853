//! Remote document store abstraction.
//!
//! The store is an external collaborator: the sync core only consumes this
//! contract. An in-process implementation lives in `volhub-store`.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::result::AppResult;
use crate::types::document::{Document, Query, Write};
use crate::types::id::SubscriptionId;

/// One change-stream delivery: the full current result set of the query,
/// or the error that terminated the stream.
pub type SnapshotEvent = AppResult<Vec<Document>>;

/// Handle that keeps a change-stream subscription alive.
///
/// Cancelling (or dropping) the handle stops delivery. Stores check the
/// token before every send.
#[derive(Debug)]
pub struct SubscriptionHandle {
    /// Subscription identifier.
    pub id: SubscriptionId,
    /// Cancellation signal shared with the store.
    token: CancellationToken,
}

impl SubscriptionHandle {
    /// Creates a handle around a store-side cancellation token.
    pub fn new(id: SubscriptionId, token: CancellationToken) -> Self {
        Self { id, token }
    }

    /// Stop receiving snapshots.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A live change-stream subscription.
#[derive(Debug)]
pub struct Subscription {
    /// Keeps the subscription alive.
    pub handle: SubscriptionHandle,
    /// Snapshots in causal order, starting with the current state.
    pub snapshots: mpsc::UnboundedReceiver<SnapshotEvent>,
}

/// Read, subscribe, and atomic-commit capabilities of the remote store.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Run a query once.
    async fn get_once(&self, query: &Query) -> AppResult<Vec<Document>>;

    /// Subscribe to a query. The current result is delivered immediately,
    /// then again after every commit touching a matching document.
    async fn subscribe(&self, query: Query) -> AppResult<Subscription>;

    /// Apply all writes as one unit: either every write lands or none does.
    async fn commit_atomic(&self, writes: Vec<Write>) -> AppResult<()>;
}
