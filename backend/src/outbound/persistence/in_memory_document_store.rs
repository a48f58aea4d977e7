//! In-process `DocumentStore` with optimistic, versioned transactions.
//!
//! Every document carries the store-wide version of its last write. A
//! transaction snapshots its declared reads with their versions, runs the
//! body without holding the lock, and commits only if none of those versions
//! moved; otherwise it retries. This mirrors the conflict behaviour of a
//! remote transactional store closely enough for development and tests.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::ports::{
    DocPath, Document, DocumentStore, MAX_WRITE_GROUP_SIZE, Query, StoreError, TxOutcome,
    TxSnapshot, WriteOp, merge_shallow,
};

/// Attempts a transaction gets before reporting contention.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone)]
struct Entry {
    data: Value,
    version: u64,
}

#[derive(Debug, Default)]
struct State {
    docs: BTreeMap<DocPath, Entry>,
    version: u64,
}

impl State {
    fn version_of(&self, path: &DocPath) -> Option<u64> {
        self.docs.get(path).map(|entry| entry.version)
    }

    fn apply(&mut self, ops: Vec<WriteOp>) {
        self.version += 1;
        let version = self.version;
        for op in ops {
            match op {
                WriteOp::Set { path, data, merge } => match self.docs.get_mut(&path) {
                    Some(entry) if merge => {
                        merge_shallow(&mut entry.data, data);
                        entry.version = version;
                    }
                    _ => {
                        self.docs.insert(path, Entry { data, version });
                    }
                },
                WriteOp::Delete { path } => {
                    self.docs.remove(&path);
                }
            }
        }
    }

    fn matching<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = (&'a DocPath, &'a Entry)> {
        let lower = match &query.start_after {
            Some(cursor) => Bound::Excluded(cursor),
            None => Bound::Unbounded,
        };
        self.docs
            .range((lower, Bound::Unbounded))
            .filter(|(path, entry)| query.matches(path, &entry.data))
    }
}

/// Thread-safe in-memory document store.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    state: Mutex<State>,
    max_attempts: u32,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_group_size(ops: &[WriteOp]) -> Result<(), StoreError> {
    if ops.len() > MAX_WRITE_GROUP_SIZE {
        return Err(StoreError::write_group_too_large(
            ops.len(),
            MAX_WRITE_GROUP_SIZE,
        ));
    }
    Ok(())
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override how many conflicting attempts a transaction tolerates.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every stored path starting with `prefix`, in path order.
    pub fn paths_with_prefix(&self, prefix: &str) -> Vec<DocPath> {
        self.lock()
            .docs
            .keys()
            .filter(|path| path.as_str().starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        Ok(self.lock().docs.get(path).map(|entry| Document {
            path: path.clone(),
            data: entry.data.clone(),
        }))
    }

    async fn set(&self, path: &DocPath, data: Value, merge: bool) -> Result<(), StoreError> {
        self.lock().apply(vec![WriteOp::Set {
            path: path.clone(),
            data,
            merge,
        }]);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        self.lock().apply(vec![WriteOp::delete(path.clone())]);
        Ok(())
    }

    async fn create_if_absent(&self, path: &DocPath, data: Value) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if state.docs.contains_key(path) {
            return Ok(false);
        }
        state.apply(vec![WriteOp::set(path.clone(), data)]);
        Ok(true)
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        check_group_size(&ops)?;
        self.lock().apply(ops);
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .lock()
            .matching(query)
            .take(query.limit)
            .map(|(path, entry)| Document {
                path: path.clone(),
                data: entry.data.clone(),
            })
            .collect())
    }

    async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        let unbounded = Query {
            start_after: None,
            ..query.clone()
        };
        Ok(self.lock().matching(&unbounded).count() as u64)
    }

    async fn transact(
        &self,
        reads: &[DocPath],
        body: &(dyn for<'s> Fn(&'s TxSnapshot) -> TxOutcome + Send + Sync),
    ) -> Result<bool, StoreError> {
        for attempt in 1..=self.max_attempts {
            let (snapshot, observed) = {
                let state = self.lock();
                let observed: Vec<(DocPath, Option<u64>)> = reads
                    .iter()
                    .map(|path| (path.clone(), state.version_of(path)))
                    .collect();
                let snapshot = TxSnapshot::new(
                    reads
                        .iter()
                        .map(|path| (path.clone(), state.docs.get(path).map(|e| e.data.clone()))),
                );
                (snapshot, observed)
            };

            let writes = match body(&snapshot) {
                TxOutcome::Abort => return Ok(false),
                TxOutcome::Commit(writes) => writes,
            };
            check_group_size(&writes)?;

            {
                let mut state = self.lock();
                let unchanged = observed
                    .iter()
                    .all(|(path, version)| state.version_of(path) == *version);
                if unchanged {
                    if !writes.is_empty() {
                        state.apply(writes);
                    }
                    return Ok(true);
                }
            }
            debug!(attempt, "transaction conflict; retrying");
            tokio::task::yield_now().await;
        }
        Err(StoreError::contention(self.max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CollectionPath;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::new()
    }

    fn members() -> CollectionPath {
        CollectionPath::root("vaults").doc("v1").collection("members")
    }

    #[rstest]
    #[tokio::test]
    async fn merge_creates_missing_documents(store: InMemoryDocumentStore) {
        let path = members().doc("u1");
        store
            .set(&path, json!({"role": "OWNER"}), true)
            .await
            .expect("merge succeeds");
        store
            .set(&path, json!({"status": "ACTIVE"}), true)
            .await
            .expect("merge succeeds");
        let doc = store.get(&path).await.expect("get").expect("present");
        assert_eq!(doc.data, json!({"role": "OWNER", "status": "ACTIVE"}));
    }

    #[rstest]
    #[tokio::test]
    async fn create_if_absent_only_creates_once(store: InMemoryDocumentStore) {
        let path = CollectionPath::root("emailEvents").doc("abc");
        assert!(store.create_if_absent(&path, json!({"n": 1})).await.expect("create"));
        assert!(!store.create_if_absent(&path, json!({"n": 2})).await.expect("create"));
        let doc = store.get(&path).await.expect("get").expect("present");
        assert_eq!(doc.data["n"], 1);
    }

    #[rstest]
    #[tokio::test]
    async fn queries_page_in_path_order(store: InMemoryDocumentStore) {
        for id in ["c", "a", "b"] {
            store
                .set(&members().doc(id), json!({"status": "ACTIVE"}), false)
                .await
                .expect("seed");
        }
        let first = store
            .query(&Query::collection(members()).limit(2))
            .await
            .expect("query");
        let ids: Vec<&str> = first.iter().map(|doc| doc.path.id()).collect();
        assert_eq!(ids, ["a", "b"]);

        let rest = store
            .query(&Query::collection(members()).start_after(Some(first[1].path.clone())))
            .await
            .expect("query");
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].path.id(), "c");
        assert_eq!(
            store.count(&Query::collection(members())).await.expect("count"),
            3
        );
    }

    #[rstest]
    #[tokio::test]
    async fn oversized_write_groups_are_rejected(store: InMemoryDocumentStore) {
        let ops: Vec<WriteOp> = (0..=MAX_WRITE_GROUP_SIZE)
            .map(|i| WriteOp::delete(members().doc(&format!("u{i}"))))
            .collect();
        let err = store.batch_write(ops).await.expect_err("too large");
        assert!(matches!(err, StoreError::WriteGroupTooLarge { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn aborted_transactions_write_nothing(store: InMemoryDocumentStore) {
        let path = members().doc("u1");
        let committed = store
            .transact(std::slice::from_ref(&path), &|_snapshot: &TxSnapshot| TxOutcome::Abort)
            .await
            .expect("transact");
        assert!(!committed);
        assert!(store.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn port_transactions_read_their_snapshot(store: InMemoryDocumentStore) {
        use crate::domain::ports::{TxPlan, run_transaction};

        let path = members().doc("u1");
        store
            .set(&path, json!({"n": 41}), false)
            .await
            .expect("seed");
        let port: &dyn DocumentStore = &store;

        let seen = run_transaction(
            port,
            std::slice::from_ref(&path),
            |snapshot: &TxSnapshot| -> Result<TxPlan<u64>, StoreError> {
                let current = snapshot
                    .get(&path)
                    .and_then(|value| value["n"].as_u64())
                    .unwrap_or(0);
                Ok(TxPlan::new(
                    vec![WriteOp::set(path.clone(), json!({"n": current + 1}))],
                    current,
                ))
            },
        )
        .await
        .expect("transaction commits");

        assert_eq!(seen, 41);
        let doc = store.get(&path).await.expect("get").expect("present");
        assert_eq!(doc.data["n"], 42);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_serialised() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryDocumentStore::new());
        let path = CollectionPath::root("counters").doc("c");
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let path = path.clone();
            tasks.push(tokio::spawn(async move {
                let reads = [path.clone()];
                store
                    .transact(&reads, &|snapshot: &TxSnapshot| {
                        let current = snapshot
                            .get(&path)
                            .and_then(|value| value["n"].as_u64())
                            .unwrap_or(0);
                        TxOutcome::Commit(vec![WriteOp::set(path.clone(), json!({"n": current + 1}))])
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.expect("join").expect("commit");
        }
        let doc = store.get(&path).await.expect("get").expect("present");
        assert_eq!(doc.data["n"], 20);
    }
}
