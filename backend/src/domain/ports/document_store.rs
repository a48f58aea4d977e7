//! Port for the transactional document store backing every vault record.
//!
//! The store offers per-document reads and writes, bounded atomic write
//! groups, path-ordered pagination and optimistic transactions. Domain
//! services never assume cross-collection atomicity beyond a single
//! [`DocumentStore::transact`] call or a single [`DocumentStore::batch_write`].

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::Error;

use super::define_port_error;

/// Hard ceiling on documents touched by one atomic write group.
pub const MAX_WRITE_GROUP_SIZE: usize = 500;

define_port_error! {
    /// Errors raised by document store adapters.
    pub enum StoreError {
        /// The backing store could not be reached or is not configured.
        Unavailable { message: String } => "document store unavailable: {message}",
        /// A read or write failed during execution.
        Query { message: String } => "document store query failed: {message}",
        /// A document could not be encoded or decoded.
        Serialization { message: String } => "document serialization failed: {message}",
        /// Optimistic retries were exhausted.
        Contention { attempts: u32 } =>
            "transaction abandoned after {attempts} conflicting attempts",
        /// A write group exceeded [`MAX_WRITE_GROUP_SIZE`].
        WriteGroupTooLarge { size: usize, max: usize } =>
            "write group of {size} documents exceeds the limit of {max}",
    }
}

impl From<StoreError> for Error {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable { message } => {
                tracing::error!(%message, "document store unavailable");
                Error::service_unavailable("Document store unavailable")
            }
            other => {
                tracing::error!(error = %other, "document store failure");
                Error::internal(other.to_string())
            }
        }
    }
}

/// Path of a collection: an odd number of `/`-separated segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Top-level collection such as `vaults`.
    pub fn root(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// Document `id` inside this collection.
    pub fn doc(&self, id: &str) -> DocPath {
        DocPath(format!("{}/{id}", self.0))
    }

    /// Final segment: the collection's name.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(self.0.as_str())
    }

    /// Full path.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a document: an even number of `/`-separated segments.
///
/// # Examples
/// ```
/// use vault_backend::domain::ports::CollectionPath;
///
/// let asset = CollectionPath::root("vaults")
///     .doc("v1")
///     .collection("assets")
///     .doc("a1");
/// assert_eq!(asset.as_str(), "vaults/v1/assets/a1");
/// assert_eq!(asset.id(), "a1");
/// assert_eq!(asset.parent().as_str(), "vaults/v1/assets");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    /// Rebuild a path previously obtained from [`DocPath::as_str`].
    ///
    /// Returns `None` when the value does not name a document.
    pub fn parse(raw: &str) -> Option<Self> {
        let segments: Vec<&str> = raw.split('/').collect();
        let well_formed = segments.len() >= 2
            && segments.len() % 2 == 0
            && segments.iter().all(|segment| !segment.is_empty());
        well_formed.then(|| Self(raw.to_owned()))
    }

    /// Subcollection `name` under this document.
    pub fn collection(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{name}", self.0))
    }

    /// Collection holding this document.
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_owned()),
            None => CollectionPath(self.0.clone()),
        }
    }

    /// Final segment: the document id.
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(self.0.as_str())
    }

    /// Full path.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub data: Value,
}

impl Document {
    /// Deserialize the document body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        decode_value(&self.path, &self.data)
    }
}

/// Deserialize a raw document body, naming the path on failure.
pub fn decode_value<T: DeserializeOwned>(path: &DocPath, data: &Value) -> Result<T, StoreError> {
    serde_json::from_value(data.clone())
        .map_err(|err| StoreError::serialization(format!("{path}: {err}")))
}

/// Serialize a domain record into a document body.
pub fn encode_value<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|err| StoreError::serialization(err.to_string()))
}

/// Apply a shallow top-level merge of `patch` onto `target`.
///
/// Non-object targets are replaced outright.
pub fn merge_shallow(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}

/// One member of an atomic write group.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        path: DocPath,
        data: Value,
        merge: bool,
    },
    Delete {
        path: DocPath,
    },
}

impl WriteOp {
    /// Replace the document at `path`.
    pub fn set(path: DocPath, data: Value) -> Self {
        Self::Set {
            path,
            data,
            merge: false,
        }
    }

    /// Shallow-merge `data` into the document at `path`, creating it if absent.
    pub fn merge(path: DocPath, data: Value) -> Self {
        Self::Set {
            path,
            data,
            merge: true,
        }
    }

    /// Serialize `record` and replace the document at `path`.
    pub fn put<T: Serialize>(path: DocPath, record: &T) -> Result<Self, StoreError> {
        Ok(Self::set(path, encode_value(record)?))
    }

    /// Delete the document at `path`. Deleting an absent document is a no-op.
    pub fn delete(path: DocPath) -> Self {
        Self::Delete { path }
    }

    /// Path touched by this operation.
    pub fn path(&self) -> &DocPath {
        match self {
            Self::Set { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// Which documents a query walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    /// Direct children of one collection.
    Collection(CollectionPath),
    /// Every collection with the given name, at any depth.
    Group(String),
}

/// Equality predicate on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

/// Path-ordered scan over a [`QueryScope`].
///
/// # Examples
/// ```
/// use vault_backend::domain::ports::{CollectionPath, Query};
///
/// let members = CollectionPath::root("vaults").doc("v1").collection("members");
/// let query = Query::collection(members)
///     .where_eq("status", "ACTIVE")
///     .limit(50);
/// assert_eq!(query.limit, 50);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub scope: QueryScope,
    pub filters: Vec<FieldFilter>,
    pub id_prefix: Option<String>,
    pub start_after: Option<DocPath>,
    pub limit: usize,
}

impl Query {
    /// Scan one collection.
    pub fn collection(path: CollectionPath) -> Self {
        Self::with_scope(QueryScope::Collection(path))
    }

    /// Scan every collection named `name`.
    pub fn group(name: impl Into<String>) -> Self {
        Self::with_scope(QueryScope::Group(name.into()))
    }

    fn with_scope(scope: QueryScope) -> Self {
        Self {
            scope,
            filters: Vec::new(),
            id_prefix: None,
            start_after: None,
            limit: MAX_WRITE_GROUP_SIZE,
        }
    }

    /// Keep documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Keep documents whose id starts with `prefix`.
    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    /// Resume after `cursor` in path order.
    pub fn start_after(mut self, cursor: Option<DocPath>) -> Self {
        self.start_after = cursor;
        self
    }

    /// Page size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether a document at `path` with body `data` satisfies the predicates.
    ///
    /// The cursor and limit are not considered.
    pub fn matches(&self, path: &DocPath, data: &Value) -> bool {
        let parent = path.parent();
        let in_scope = match &self.scope {
            QueryScope::Collection(collection) => &parent == collection,
            QueryScope::Group(name) => parent.name() == name,
        };
        in_scope
            && self
                .id_prefix
                .as_deref()
                .is_none_or(|prefix| path.id().starts_with(prefix))
            && self
                .filters
                .iter()
                .all(|filter| data.get(&filter.field) == Some(&filter.value))
    }
}

/// Consistent view of the documents a transaction declared up front.
#[derive(Debug, Clone, Default)]
pub struct TxSnapshot {
    docs: BTreeMap<DocPath, Option<Value>>,
}

impl TxSnapshot {
    /// Build a snapshot from the values observed for each declared path.
    pub fn new(docs: impl IntoIterator<Item = (DocPath, Option<Value>)>) -> Self {
        Self {
            docs: docs.into_iter().collect(),
        }
    }

    /// Raw body of `path`; `None` if absent or not declared.
    pub fn get(&self, path: &DocPath) -> Option<&Value> {
        self.docs.get(path).and_then(Option::as_ref)
    }

    /// Whether `path` exists.
    pub fn exists(&self, path: &DocPath) -> bool {
        self.get(path).is_some()
    }

    /// Deserialize `path`, if present.
    pub fn decode<T: DeserializeOwned>(&self, path: &DocPath) -> Result<Option<T>, StoreError> {
        self.get(path)
            .map(|value| decode_value(path, value))
            .transpose()
    }
}

/// Decision returned by a transaction body.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
    /// Apply these writes atomically if no declared read changed.
    Commit(Vec<WriteOp>),
    /// Leave the store untouched.
    Abort,
}

/// Port for document storage.
///
/// Adapters must honour [`MAX_WRITE_GROUP_SIZE`] for `batch_write` and for
/// the writes a transaction commits, and must order query results by full
/// document path so that `start_after` cursors are stable.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document.
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Write one document, replacing it or shallow-merging into it.
    async fn set(&self, path: &DocPath, data: Value, merge: bool) -> Result<(), StoreError>;

    /// Delete one document; absent documents are ignored.
    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    /// Create `path` only if nothing exists there. Returns whether it was created.
    async fn create_if_absent(&self, path: &DocPath, data: Value) -> Result<bool, StoreError>;

    /// Apply up to [`MAX_WRITE_GROUP_SIZE`] writes atomically.
    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Page through matching documents in path order.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Count every matching document, ignoring cursor and limit.
    async fn count(&self, query: &Query) -> Result<u64, StoreError>;

    /// Run `body` over a snapshot of `reads` and commit its writes atomically.
    ///
    /// The adapter re-runs `body` against a fresh snapshot whenever a declared
    /// read changed before commit. Returns `true` if writes were committed and
    /// `false` if the body aborted.
    async fn transact(
        &self,
        reads: &[DocPath],
        body: &(dyn for<'s> Fn(&'s TxSnapshot) -> TxOutcome + Send + Sync),
    ) -> Result<bool, StoreError>;
}

/// Writes and typed result produced by a transaction body.
#[derive(Debug, Clone, PartialEq)]
pub struct TxPlan<T> {
    pub writes: Vec<WriteOp>,
    pub output: T,
}

impl<T> TxPlan<T> {
    pub fn new(writes: Vec<WriteOp>, output: T) -> Self {
        Self { writes, output }
    }

    /// A plan that writes nothing.
    pub fn read_only(output: T) -> Self {
        Self::new(Vec::new(), output)
    }
}

/// Run a typed transaction.
///
/// `body` returns either a [`TxPlan`] whose writes are committed, or an error
/// that aborts the transaction and is returned to the caller. The body may run
/// several times under contention; only the last attempt's result is kept.
pub async fn run_transaction<S, T, E, F>(store: &S, reads: &[DocPath], body: F) -> Result<T, E>
where
    S: DocumentStore + ?Sized,
    T: Send,
    E: From<StoreError> + Send,
    F: Fn(&TxSnapshot) -> Result<TxPlan<T>, E> + Send + Sync,
{
    let slot: Mutex<Option<Result<T, E>>> = Mutex::new(None);
    let wrapped = |snapshot: &TxSnapshot| {
        let (outcome, result) = match body(snapshot) {
            Ok(TxPlan { writes, output }) => (TxOutcome::Commit(writes), Ok(output)),
            Err(err) => (TxOutcome::Abort, Err(err)),
        };
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        outcome
    };
    store.transact(reads, &wrapped).await?;
    slot.into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .unwrap_or_else(|| Err(StoreError::query("transaction body never ran").into()))
}

/// Build a JSON object from key/value pairs; used for merge patches.
pub fn patch<I, K>(fields: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect::<Map<String, Value>>(),
    )
}
