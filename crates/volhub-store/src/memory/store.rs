//! In-memory document store using a Tokio mutex for single-process use.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use volhub_core::config::StoreConfig;
use volhub_core::error::AppError;
use volhub_core::result::AppResult;
use volhub_core::traits::{RemoteStore, SnapshotEvent, Subscription, SubscriptionHandle};
use volhub_core::types::{Document, DocumentRef, Query, SubscriptionId, Write};
use volhub_entity::fields;

use super::apply::{Collections, apply_write};
use super::faults::FaultPlan;

/// A registered change-stream listener.
#[derive(Debug)]
struct Subscriber {
    id: SubscriptionId,
    query: Query,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<SnapshotEvent>,
}

/// Internal state for the memory store.
#[derive(Debug, Default)]
struct InnerState {
    /// Committed documents.
    collections: Collections,
    /// Live subscriptions.
    subscribers: Vec<Subscriber>,
    /// Pending injected faults.
    faults: FaultPlan,
    /// Number of successful commits.
    commits: u64,
}

impl InnerState {
    /// Push the current result set to every live subscriber whose query may
    /// be affected by a change to one of `touched`.
    fn notify(&mut self, touched: &BTreeSet<DocumentRef>) {
        let collections = &self.collections;
        self.subscribers.retain(|sub| {
            if sub.token.is_cancelled() {
                debug!(subscription_id = %sub.id, "Dropping cancelled subscription");
                return false;
            }
            if !touched.iter().any(|r| sub.query.touches(r)) {
                return true;
            }
            sub.tx.send(Ok(run_query(collections, &sub.query))).is_ok()
        });
    }
}

/// In-memory document store.
///
/// Commits are applied to a staged copy of every collection and swapped in
/// only when all writes succeed, so a failing commit never leaves partial
/// state behind. Snapshot delivery happens under the same lock as the
/// commit, which keeps per-subscriber delivery in commit order.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// Protected inner state.
    state: Arc<Mutex<InnerState>>,
    /// Commit gate: commits wait while it is `false`.
    gate: Arc<watch::Sender<bool>>,
    /// Commits currently waiting at the gate.
    parked: Arc<AtomicUsize>,
    /// Reject commits that overfill an opportunity.
    enforce_capacity: bool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new(config: &StoreConfig) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Arc::new(Mutex::new(InnerState::default())),
            gate: Arc::new(gate),
            parked: Arc::new(AtomicUsize::new(0)),
            enforce_capacity: config.enforce_capacity,
        }
    }

    /// Insert or replace documents without going through a commit.
    /// Subscribers are notified.
    pub async fn put_documents(&self, docs: impl IntoIterator<Item = Document>) {
        let mut state = self.state.lock().await;
        let mut touched = BTreeSet::new();
        for doc in docs {
            state
                .collections
                .entry(doc.reference.collection.clone())
                .or_default()
                .insert(doc.reference.id.clone(), doc.fields);
            touched.insert(doc.reference);
        }
        state.notify(&touched);
    }

    /// Read one document.
    pub async fn document(&self, reference: &DocumentRef) -> Option<Document> {
        let state = self.state.lock().await;
        run_query(&state.collections, &Query::Document(reference.clone()))
            .into_iter()
            .next()
    }

    /// Every committed document, ordered by collection then id.
    pub async fn documents(&self) -> Vec<Document> {
        let state = self.state.lock().await;
        state
            .collections
            .iter()
            .flat_map(|(collection, docs)| {
                docs.iter().map(move |(id, fields)| {
                    Document::new(DocumentRef::new(collection.clone(), id), fields.clone())
                })
            })
            .collect()
    }

    /// Replace the pending fault plan.
    pub async fn set_faults(&self, faults: FaultPlan) {
        self.state.lock().await.faults = faults;
    }

    /// Number of successful commits so far.
    pub async fn commit_count(&self) -> u64 {
        self.state.lock().await.commits
    }

    /// Number of live (not cancelled) subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        let state = self.state.lock().await;
        state
            .subscribers
            .iter()
            .filter(|s| !s.token.is_cancelled())
            .count()
    }

    /// Park every commit that starts from now on until [`Self::release_commits`].
    pub fn hold_commits(&self) {
        self.gate.send_replace(false);
    }

    /// Let parked and future commits proceed.
    pub fn release_commits(&self) {
        self.gate.send_replace(true);
    }

    /// Commits currently parked at the gate.
    pub fn parked_commits(&self) -> usize {
        self.parked.load(Ordering::SeqCst)
    }

    /// Terminate every subscription on `collection` with an error.
    pub async fn break_subscriptions(&self, collection: &str) {
        let mut state = self.state.lock().await;
        state.subscribers.retain(|sub| {
            let affected = match &sub.query {
                Query::Document(r) => r.collection == collection,
                Query::Collection { collection: c, .. } => c == collection,
            };
            if affected {
                warn!(subscription_id = %sub.id, collection, "Breaking subscription");
                let _ = sub.tx.send(Err(AppError::subscription(format!(
                    "Change stream for '{collection}' terminated"
                ))));
            }
            !affected
        });
    }

    async fn wait_for_gate(&self) -> AppResult<()> {
        let mut rx = self.gate.subscribe();
        if *rx.borrow() {
            return Ok(());
        }

        self.parked.fetch_add(1, Ordering::SeqCst);
        let result = rx.wait_for(|open| *open).await.map(|_| ());
        self.parked.fetch_sub(1, Ordering::SeqCst);

        result.map_err(|_| AppError::commit_failed("Store shut down while commit was pending"))
    }

    fn check_capacity(
        &self,
        before: &Collections,
        after: &Collections,
        touched: &BTreeSet<DocumentRef>,
    ) -> AppResult<()> {
        for reference in touched.iter().filter(|r| r.collection == fields::OPPORTUNITIES) {
            let Some(doc) = after
                .get(&reference.collection)
                .and_then(|c| c.get(&reference.id))
            else {
                continue;
            };
            let Some(capacity) = doc.get(fields::CAPACITY).and_then(Value::as_u64) else {
                continue;
            };

            let count_in = |entry: Option<&serde_json::Map<String, Value>>| {
                entry
                    .and_then(|f| f.get(fields::ATTENDEE_IDS))
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len) as u64
            };
            let now = count_in(Some(doc));
            let was = count_in(
                before
                    .get(&reference.collection)
                    .and_then(|c| c.get(&reference.id)),
            );

            if now > capacity && now > was {
                return Err(AppError::commit_failed(format!(
                    "Capacity of {reference} exceeded ({now} > {capacity})"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get_once(&self, query: &Query) -> AppResult<Vec<Document>> {
        let state = self.state.lock().await;
        Ok(run_query(&state.collections, query))
    }

    async fn subscribe(&self, query: Query) -> AppResult<Subscription> {
        let mut state = self.state.lock().await;
        if state.faults.reject_subscriptions {
            return Err(AppError::subscription(format!(
                "Subscription rejected for {query:?}"
            )));
        }

        let id = SubscriptionId::new();
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        // Initial snapshot is delivered before any later commit can notify.
        let _ = tx.send(Ok(run_query(&state.collections, &query)));
        state.subscribers.push(Subscriber {
            id,
            query,
            token: token.clone(),
            tx,
        });

        debug!(subscription_id = %id, "Subscription registered");
        Ok(Subscription {
            handle: SubscriptionHandle::new(id, token),
            snapshots: rx,
        })
    }

    async fn commit_atomic(&self, writes: Vec<Write>) -> AppResult<()> {
        self.wait_for_gate().await?;

        let mut state = self.state.lock().await;
        let fault = state.faults.take_commit_fault();
        let mut staged = state.collections.clone();

        for (applied, write) in writes.iter().enumerate() {
            if fault == Some(applied) {
                warn!(applied, total = writes.len(), "Injected commit failure");
                return Err(AppError::commit_failed(format!(
                    "Injected failure after {applied} writes"
                )));
            }
            apply_write(&mut staged, write)?;
        }
        if fault.is_some() {
            warn!(total = writes.len(), "Injected commit failure after all writes");
            return Err(AppError::commit_failed("Injected failure before swap"));
        }

        let touched: BTreeSet<DocumentRef> = writes.iter().map(|w| w.document().clone()).collect();
        if self.enforce_capacity {
            self.check_capacity(&state.collections, &staged, &touched)?;
        }

        state.collections = staged;
        state.commits += 1;
        state.notify(&touched);

        info!(writes = writes.len(), documents = touched.len(), "Commit applied");
        Ok(())
    }
}

/// Evaluate a query against committed state.
fn run_query(collections: &Collections, query: &Query) -> Vec<Document> {
    match query {
        Query::Document(reference) => collections
            .get(&reference.collection)
            .and_then(|c| c.get(&reference.id))
            .map(|fields| vec![Document::new(reference.clone(), fields.clone())])
            .unwrap_or_default(),
        Query::Collection { collection, .. } => collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| {
                        Document::new(DocumentRef::new(collection.clone(), id), fields.clone())
                    })
                    .filter(|doc| query.matches(doc))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use volhub_core::error::ErrorKind;
    use volhub_core::types::FieldOp;

    fn make_store() -> MemoryStore {
        MemoryStore::new(&StoreConfig::default())
    }

    fn doc(collection: &str, id: &str, fields: Value) -> Document {
        let Value::Object(map) = fields else {
            panic!("expected object");
        };
        Document::new(DocumentRef::new(collection, id), map)
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = make_store();
        store
            .put_documents([
                doc("opportunities", "o1", json!({"attendeeIds": []})),
                doc("users", "u1", json!({"rsvpIds": []})),
            ])
            .await;
        store.set_faults(FaultPlan::fail_after_writes(1)).await;

        let writes = vec![
            Write::field(
                DocumentRef::new("opportunities", "o1"),
                "attendeeIds",
                FieldOp::ArrayUnion(json!("u1")),
            ),
            Write::field(
                DocumentRef::new("users", "u1"),
                "rsvpIds",
                FieldOp::ArrayUnion(json!("o1")),
            ),
        ];
        let err = store.commit_atomic(writes.clone()).await.expect_err("injected");
        assert_eq!(err.kind, ErrorKind::StoreCommitFailed);

        let opp = store.document(&DocumentRef::new("opportunities", "o1")).await.expect("doc");
        let user = store.document(&DocumentRef::new("users", "u1")).await.expect("doc");
        assert_eq!(opp.fields["attendeeIds"], json!([]));
        assert_eq!(user.fields["rsvpIds"], json!([]));
        assert_eq!(store.commit_count().await, 0);

        store.commit_atomic(writes).await.expect("second attempt succeeds");
        assert_eq!(store.commit_count().await, 1);
    }

    #[tokio::test]
    async fn test_subscription_receives_initial_and_updates() {
        let store = make_store();
        store.put_documents([doc("users", "u1", json!({"favoriteIds": []}))]).await;

        let mut sub = store
            .subscribe(Query::Document(DocumentRef::new("users", "u1")))
            .await
            .expect("subscribe");
        let initial = sub.snapshots.recv().await.expect("initial").expect("ok");
        assert_eq!(initial.len(), 1);

        store
            .commit_atomic(vec![Write::field(
                DocumentRef::new("users", "u1"),
                "favoriteIds",
                FieldOp::ArrayUnion(json!("o9")),
            )])
            .await
            .expect("commit");
        let update = sub.snapshots.recv().await.expect("update").expect("ok");
        assert_eq!(update[0].fields["favoriteIds"], json!(["o9"]));
    }

    #[tokio::test]
    async fn test_cancelled_subscription_is_dropped() {
        let store = make_store();
        let sub = store.subscribe(Query::collection("opportunities")).await.expect("subscribe");
        assert_eq!(store.subscriber_count().await, 1);
        drop(sub);
        assert_eq!(store.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_rule_rejects_overfill() {
        let store = make_store();
        store
            .put_documents([doc(
                "opportunities",
                "o1",
                json!({"capacity": 1, "attendeeIds": ["a"]}),
            )])
            .await;
        let err = store
            .commit_atomic(vec![Write::field(
                DocumentRef::new("opportunities", "o1"),
                "attendeeIds",
                FieldOp::ArrayUnion(json!("b")),
            )])
            .await
            .expect_err("over capacity");
        assert_eq!(err.kind, ErrorKind::StoreCommitFailed);

        // Shrinking an already overfull set is still allowed.
        store
            .commit_atomic(vec![Write::field(
                DocumentRef::new("opportunities", "o1"),
                "attendeeIds",
                FieldOp::ArrayRemove(json!("a")),
            )])
            .await
            .expect("remove");
    }

    #[tokio::test]
    async fn test_held_commit_waits_for_release() {
        let store = make_store();
        store.put_documents([doc("users", "u1", json!({}))]).await;
        store.hold_commits();

        let pending = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .commit_atomic(vec![Write::field(
                        DocumentRef::new("users", "u1"),
                        "displayName",
                        FieldOp::Set(json!("Ada")),
                    )])
                    .await
            })
        };

        while store.parked_commits() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.commit_count().await, 0);

        store.release_commits();
        pending.await.expect("join").expect("commit");
        assert_eq!(store.commit_count().await, 1);
    }

    #[tokio::test]
    async fn test_break_subscriptions_sends_error() {
        let store = make_store();
        let mut sub = store.subscribe(Query::collection("opportunities")).await.expect("subscribe");
        let _ = sub.snapshots.recv().await;
        store.break_subscriptions("opportunities").await;
        let event = sub.snapshots.recv().await.expect("error event");
        assert_eq!(event.expect_err("broken").kind, ErrorKind::Subscription);
        assert!(sub.snapshots.recv().await.is_none());
    }
}
