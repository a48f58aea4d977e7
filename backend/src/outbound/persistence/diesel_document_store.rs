//! PostgreSQL-backed `DocumentStore`.
//!
//! Documents live in a single `documents` table keyed by full path. Queries
//! use jsonb containment for equality filters and page by path. Transactions
//! run at `SERIALIZABLE` isolation and are retried on serialization
//! failures, which gives the same "re-run the body on conflict" contract as
//! the in-memory adapter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::ports::{
    DocPath, Document, DocumentStore, MAX_WRITE_GROUP_SIZE, Query, QueryScope, StoreError,
    TxOutcome, TxSnapshot, WriteOp,
};

use super::models::{DocumentRow, NewDocumentRow};
use super::pool::{DbPool, PoolError};
use super::schema::documents;

/// Serialization failures tolerated before reporting contention.
const MAX_TX_ATTEMPTS: u32 = 25;
const RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// Diesel implementation of the `DocumentStore` port.
#[derive(Clone)]
pub struct DieselDocumentStore {
    pool: DbPool,
}

impl DieselDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run a trivial query; used by readiness probes.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }
}

fn map_pool_error(error: PoolError) -> StoreError {
    StoreError::unavailable(error.message())
}

fn map_diesel_error(error: DieselError) -> StoreError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            StoreError::unavailable("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            StoreError::contention(1_u32)
        }
        DieselError::DeserializationError(err) | DieselError::SerializationError(err) => {
            StoreError::serialization(err.to_string())
        }
        DieselError::QueryBuilderError(_) => StoreError::query("database query error"),
        _ => StoreError::query("database error"),
    }
}

/// Failure inside a transaction closure.
enum TxError {
    Diesel(DieselError),
    Store(StoreError),
}

impl From<DieselError> for TxError {
    fn from(value: DieselError) -> Self {
        Self::Diesel(value)
    }
}

impl TxError {
    fn is_serialization_failure(&self) -> bool {
        matches!(
            self,
            Self::Diesel(DieselError::DatabaseError(
                DatabaseErrorKind::SerializationFailure,
                _
            ))
        )
    }

    fn into_store_error(self) -> StoreError {
        match self {
            Self::Diesel(err) => map_diesel_error(err),
            Self::Store(err) => err,
        }
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

/// Escape LIKE metacharacters so `prefix` matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// `{field: value}` object used for jsonb containment.
fn containment(field: &str, value: &Value) -> Value {
    let mut object = Map::new();
    object.insert(field.to_owned(), value.clone());
    Value::Object(object)
}

fn filtered(query: &Query, with_cursor: bool) -> documents::BoxedQuery<'static, Pg> {
    let mut statement = documents::table.into_boxed();
    statement = match &query.scope {
        QueryScope::Collection(collection) => {
            statement.filter(documents::parent.eq(collection.as_str().to_owned()))
        }
        QueryScope::Group(name) => statement.filter(documents::collection_name.eq(name.clone())),
    };
    for filter in &query.filters {
        statement = statement.filter(documents::data.contains(containment(&filter.field, &filter.value)));
    }
    if let Some(prefix) = &query.id_prefix {
        statement = statement.filter(documents::doc_id.like(like_prefix(prefix)));
    }
    if with_cursor {
        if let Some(cursor) = &query.start_after {
            statement = statement.filter(documents::path.gt(cursor.as_str().to_owned()));
        }
    }
    statement
}

fn into_document(row: DocumentRow) -> Result<Document, StoreError> {
    let path = DocPath::parse(&row.path)
        .ok_or_else(|| StoreError::serialization(format!("stored path {} is malformed", row.path)))?;
    Ok(Document {
        path,
        data: row.data,
    })
}

async fn apply_writes(conn: &mut AsyncPgConnection, ops: &[WriteOp]) -> Result<(), DieselError> {
    let now = Utc::now();
    for op in ops {
        match op {
            WriteOp::Set { path, data, merge } => {
                let row = NewDocumentRow::new(path, data, now);
                let insert = diesel::insert_into(documents::table)
                    .values(&row)
                    .on_conflict(documents::path)
                    .do_update();
                if *merge {
                    insert
                        .set((
                            documents::data.eq(documents::data.concat(excluded(documents::data))),
                            documents::version.eq(documents::version + 1),
                            documents::updated_at.eq(excluded(documents::updated_at)),
                        ))
                        .execute(conn)
                        .await?;
                } else {
                    insert
                        .set((
                            documents::data.eq(excluded(documents::data)),
                            documents::version.eq(documents::version + 1),
                            documents::updated_at.eq(excluded(documents::updated_at)),
                        ))
                        .execute(conn)
                        .await?;
                }
            }
            WriteOp::Delete { path } => {
                diesel::delete(documents::table.filter(documents::path.eq(path.as_str())))
                    .execute(conn)
                    .await?;
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for DieselDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = documents::table
            .filter(documents::path.eq(path.as_str()))
            .select(DocumentRow::as_select())
            .first::<DocumentRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(into_document).transpose()
    }

    async fn set(&self, path: &DocPath, data: Value, merge: bool) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let op = WriteOp::Set {
            path: path.clone(),
            data,
            merge,
        };
        apply_writes(&mut conn, std::slice::from_ref(&op))
            .await
            .map_err(map_diesel_error)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        apply_writes(&mut conn, &[WriteOp::delete(path.clone())])
            .await
            .map_err(map_diesel_error)
    }

    async fn create_if_absent(&self, path: &DocPath, data: Value) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewDocumentRow::new(path, &data, Utc::now());
        let inserted = diesel::insert_into(documents::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted == 1)
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        check_group_size(&ops)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| async move { apply_writes(conn, &ops).await }.scope_boxed())
            .await
            .map_err(map_diesel_error)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let rows = filtered(query, true)
            .select(DocumentRow::as_select())
            .order(documents::path.asc())
            .limit(limit)
            .load::<DocumentRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(into_document).collect()
    }

    async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered(query, false)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn transact(
        &self,
        reads: &[DocPath],
        body: &(dyn for<'s> Fn(&'s TxSnapshot) -> TxOutcome + Send + Sync),
    ) -> Result<bool, StoreError> {
        let keys: Vec<String> = reads.iter().map(|path| path.as_str().to_owned()).collect();
        for attempt in 1..=MAX_TX_ATTEMPTS {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let keys = &keys;
            let result: Result<bool, TxError> = conn
                .build_transaction()
                .serializable()
                .run(|conn| {
                    async move {
                        let rows = documents::table
                            .filter(documents::path.eq_any(keys))
                            .select(DocumentRow::as_select())
                            .load::<DocumentRow>(conn)
                            .await?;
                        let mut found: Vec<(DocPath, Option<Value>)> =
                            reads.iter().map(|path| (path.clone(), None)).collect();
                        for row in rows {
                            if let Some(slot) = found
                                .iter_mut()
                                .find(|(path, _)| path.as_str() == row.path)
                            {
                                slot.1 = Some(row.data);
                            }
                        }
                        let snapshot = TxSnapshot::new(found);
                        match body(&snapshot) {
                            TxOutcome::Abort => Ok(false),
                            TxOutcome::Commit(writes) => {
                                check_group_size(&writes).map_err(TxError::Store)?;
                                apply_writes(conn, &writes).await?;
                                Ok(true)
                            }
                        }
                    }
                    .scope_boxed()
                })
                .await;
            match result {
                Ok(committed) => return Ok(committed),
                Err(err) if err.is_serialization_failure() => {
                    debug!(attempt, "serialization failure; retrying transaction");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => return Err(err.into_store_error()),
            }
        }
        Err(StoreError::contention(MAX_TX_ATTEMPTS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("inv_", "inv\\_%")]
    #[case("50%", "50\\%%")]
    #[case("plain", "plain%")]
    fn like_prefix_escapes_metacharacters(#[case] prefix: &str, #[case] expected: &str) {
        assert_eq!(like_prefix(prefix), expected);
    }

    #[rstest]
    fn containment_wraps_field_in_object() {
        assert_eq!(
            containment("status", &json!("ACTIVE")),
            json!({"status": "ACTIVE"})
        );
    }

    #[rstest]
    fn closed_connections_are_unavailable() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("closed".to_owned()),
        );
        assert!(matches!(map_diesel_error(err), StoreError::Unavailable { .. }));
    }

    #[rstest]
    fn pool_errors_are_unavailable() {
        let err = map_pool_error(PoolError::checkout("timed out"));
        assert_eq!(err, StoreError::unavailable("timed out"));
    }
}
