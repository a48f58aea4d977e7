//! Cascading vault teardown.

use tracing::info;

use super::paths::{self, VAULT_TEARDOWN_ORDER};
use super::ports::{DocumentStore, Query, StoreError};
use super::purge::purge_matching;
use super::VaultId;

/// Delete every document under `vault_id`, then the vault itself.
///
/// Subcollections go in [`VAULT_TEARDOWN_ORDER`]; the vault document is
/// removed last so a partial teardown can be re-run from the top. Returns the
/// number of subcollection documents deleted.
pub async fn delete_vault_tree(
    store: &dyn DocumentStore,
    vault_id: &VaultId,
) -> Result<u64, StoreError> {
    let mut deleted = 0_u64;
    for name in VAULT_TEARDOWN_ORDER {
        let query = Query::collection(paths::vault_child(vault_id, name));
        deleted += purge_matching(store, &query).await?;
    }
    store.delete(&paths::vault_subscription(vault_id)).await?;
    store.delete(&paths::vault(vault_id)).await?;
    info!(vault_id = %vault_id, deleted, "vault tree deleted");
    Ok(deleted)
}
