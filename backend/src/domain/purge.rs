//! Paginated scans, bulk deletes and bulk updates bounded by the write-group
//! limit.
//!
//! Each page is one atomic write group; the sequence of pages is not. Every
//! helper is safe to re-run after a partial failure because deleted
//! documents simply stop matching and the cursor only moves forward.

use serde_json::Value;
use tracing::{debug, warn};

use super::paths;
use super::ports::{DocPath, Document, DocumentStore, Query, StoreError, WriteOp};
use super::{GrantScope, UserId, VaultId};

/// Documents fetched and rewritten per write group.
pub const PURGE_PAGE_SIZE: usize = 400;

async fn rewrite_matching<F>(
    store: &dyn DocumentStore,
    query: &Query,
    op: F,
) -> Result<u64, StoreError>
where
    F: Fn(DocPath) -> WriteOp,
{
    let mut cursor = None;
    let mut total = 0_u64;
    loop {
        let page = store
            .query(&query.clone().start_after(cursor.take()).limit(PURGE_PAGE_SIZE))
            .await?;
        let Some(last) = page.last().map(|doc| doc.path.clone()) else {
            break;
        };
        let fetched = page.len();
        let ops: Vec<WriteOp> = page.into_iter().map(|doc| op(doc.path)).collect();
        store.batch_write(ops).await?;
        total += fetched as u64;
        if fetched < PURGE_PAGE_SIZE {
            break;
        }
        cursor = Some(last);
    }
    Ok(total)
}

/// Read every document matching `query`, page by page.
pub async fn scan_all(store: &dyn DocumentStore, query: &Query) -> Result<Vec<Document>, StoreError> {
    let mut cursor = None;
    let mut documents = Vec::new();
    loop {
        let page = store
            .query(&query.clone().start_after(cursor.take()).limit(PURGE_PAGE_SIZE))
            .await?;
        let fetched = page.len();
        cursor = page.last().map(|doc| doc.path.clone());
        documents.extend(page);
        if fetched < PURGE_PAGE_SIZE {
            return Ok(documents);
        }
    }
}

/// Delete every document matching `query`. Returns how many were deleted.
pub async fn purge_matching(store: &dyn DocumentStore, query: &Query) -> Result<u64, StoreError> {
    let deleted = rewrite_matching(store, query, WriteOp::delete).await?;
    debug!(?query.scope, deleted, "purged documents");
    Ok(deleted)
}

/// Shallow-merge `fields` into every document matching `query`.
pub async fn update_matching(
    store: &dyn DocumentStore,
    query: &Query,
    fields: &Value,
) -> Result<u64, StoreError> {
    rewrite_matching(store, query, |path| WriteOp::merge(path, fields.clone())).await
}

/// Best-effort removal of every grant on one resource.
pub async fn purge_resource_grants(
    store: &dyn DocumentStore,
    vault_id: &VaultId,
    scope: GrantScope,
    scope_id: &str,
) -> u64 {
    let query = Query::collection(paths::grants(vault_id)).id_prefix(paths::grant_prefix(scope, scope_id));
    match purge_matching(store, &query).await {
        Ok(deleted) => deleted,
        Err(error) => {
            warn!(vault_id = %vault_id, scope = scope.as_str(), scope_id, %error, "grant purge failed");
            0
        }
    }
}

/// Delete every grant `user_id` holds in `vault_id`.
pub async fn purge_user_grants(
    store: &dyn DocumentStore,
    vault_id: &VaultId,
    user_id: &UserId,
) -> Result<u64, StoreError> {
    let query = Query::collection(paths::grants(vault_id)).where_eq("userId", user_id.as_str());
    purge_matching(store, &query).await
}
