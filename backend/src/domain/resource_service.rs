//! Collection and asset mutations and reads.
//!
//! Creates run: validate, permission check, daily write quota, cached
//! capacity check, then one transaction that re-reads the counters, re-checks
//! the cap, writes the resource and bumps the counter. The in-transaction
//! check is authoritative; the cached one only avoids doomed transactions.
//!
//! Deletes run one transaction per target that removes the document and
//! decrements its counter, clamped at zero. Missing targets succeed without
//! touching counters.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::info;

use crate::domain::access::{GrantTarget, VaultAccess};
use crate::domain::audit::AuditEventType;
use crate::domain::governance::Governance;
use crate::domain::paths;
use crate::domain::ports::{
    CreateAssetRequest, CreateCollectionRequest, DeleteAssetRequest, DeleteAssetResponse,
    DeleteCollectionRequest, DeleteCollectionResponse, DocPath, Document, GetAssetRequest,
    ListAssetsRequest, ListCollectionsRequest, Query, ResourceCommand, ResourceQuery, TxPlan,
    WriteOp, run_transaction,
};
use crate::domain::purge::{PURGE_PAGE_SIZE, purge_resource_grants};
use crate::domain::usage::{check_capacity, counters_in, write_counters};
use crate::domain::vault::{
    BODY_MAX_LEN, DESCRIPTION_MAX_LEN, NAME_MAX_LEN, optional_media_url, optional_text,
    required_text,
};
use crate::domain::{
    Action, Asset, AssetId, CapacityField, Collection, CollectionId, Error, GrantScope, Page,
    QuotaKind, VaultId,
};

/// Page size used when a listing does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Largest page a listing may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Implements [`ResourceCommand`] and [`ResourceQuery`].
#[derive(Clone)]
pub struct ResourceService {
    governance: Governance,
}

fn page_limit(requested: usize) -> usize {
    if requested == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        requested.min(MAX_PAGE_SIZE)
    }
}

/// Decode a query page; a full page yields the last id as the next cursor.
fn decode_page<T: DeserializeOwned>(docs: Vec<Document>, limit: usize) -> Result<Page<T>, Error> {
    let next_cursor = (docs.len() == limit)
        .then(|| docs.last().map(|doc| doc.path.id().to_owned()))
        .flatten();
    let items = docs
        .iter()
        .map(Document::decode)
        .collect::<Result<Vec<T>, _>>()?;
    Ok(Page { items, next_cursor })
}

impl ResourceService {
    pub fn new(governance: Governance) -> Self {
        Self { governance }
    }

    /// Delete one page of a collection's assets in a single transaction.
    async fn delete_asset_page(
        &self,
        vault_id: &VaultId,
        asset_paths: &[DocPath],
    ) -> Result<u64, Error> {
        let counters_path = paths::counters(vault_id);
        let mut reads = asset_paths.to_vec();
        reads.push(counters_path);
        run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<u64>, Error> {
                let mut writes: Vec<WriteOp> = asset_paths
                    .iter()
                    .filter(|path| snapshot.exists(path))
                    .map(|path| WriteOp::delete(path.clone()))
                    .collect();
                let removed = writes.len() as u64;
                if removed > 0 {
                    let counters = counters_in(snapshot, vault_id)?
                        .adjusted(CapacityField::Assets, -(removed as i64));
                    writes.push(write_counters(vault_id, &counters)?);
                }
                Ok(TxPlan::new(writes, removed))
            },
        )
        .await
    }

    async fn load_asset(&self, vault_id: &VaultId, asset_id: &AssetId) -> Result<Option<Asset>, Error> {
        match self
            .governance
            .store
            .get(&paths::asset(vault_id, asset_id))
            .await?
        {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    async fn require_view(&self, access: &VaultAccess, targets: &[GrantTarget<'_>]) -> Result<(), Error> {
        access
            .require(self.governance.store.as_ref(), Action::View, targets)
            .await
    }
}

#[async_trait]
impl ResourceCommand for ResourceService {
    async fn create_collection(
        &self,
        request: CreateCollectionRequest,
    ) -> Result<Collection, Error> {
        let name = required_text("name", &request.name, NAME_MAX_LEN)?;
        let description =
            optional_text("description", request.description.as_deref(), DESCRIPTION_MAX_LEN)?;
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        let store = self.governance.store.as_ref();
        access.require(store, Action::Create, &[]).await?;
        let actor = &request.caller.user_id;
        let plan = self
            .governance
            .quotas
            .consume(&access.vault, actor, QuotaKind::Write, 1)
            .await?;
        let cached = self.governance.usage.ensure(&request.vault_id).await?;
        check_capacity(&plan, &cached, CapacityField::Collections, 1)?;

        let now = self.governance.clock.utc();
        let collection = Collection {
            id: CollectionId::generate(),
            name,
            description,
            owner_id: actor.clone(),
            created_at: now,
            last_edited_at: now,
            moved_from: None,
        };
        let vault_id = &request.vault_id;
        let counters_path = paths::counters(vault_id);
        let collection_path = paths::collection(vault_id, &collection.id);
        let reads = [counters_path, collection_path.clone()];

        run_transaction(store, &reads, |snapshot| -> Result<TxPlan<()>, Error> {
            let counters = counters_in(snapshot, vault_id)?;
            check_capacity(&plan, &counters, CapacityField::Collections, 1)?;
            if snapshot.exists(&collection_path) {
                return Err(Error::conflict("Collection already exists"));
            }
            Ok(TxPlan::new(
                vec![
                    WriteOp::put(collection_path.clone(), &collection)?,
                    write_counters(vault_id, &counters.adjusted(CapacityField::Collections, 1))?,
                ],
                (),
            ))
        })
        .await?;

        info!(vault_id = %vault_id, collection_id = %collection.id, "collection created");
        self.governance
            .audit
            .record_with_plan(
                vault_id,
                &plan,
                actor,
                AuditEventType::CollectionCreated,
                json!({ "collectionId": collection.id, "name": collection.name }),
            )
            .await;
        Ok(collection)
    }

    async fn create_asset(&self, request: CreateAssetRequest) -> Result<Asset, Error> {
        let title = required_text("title", &request.title, NAME_MAX_LEN)?;
        let body = optional_text("body", request.body.as_deref(), BODY_MAX_LEN)?;
        let media_url = optional_media_url(request.media_url.as_deref())?;
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        let store = self.governance.store.as_ref();
        access
            .require(
                store,
                Action::Create,
                &[GrantTarget::collection(&request.collection_id)],
            )
            .await?;
        let actor = &request.caller.user_id;
        let plan = self
            .governance
            .quotas
            .consume(&access.vault, actor, QuotaKind::Write, 1)
            .await?;
        let cached = self.governance.usage.ensure(&request.vault_id).await?;
        check_capacity(&plan, &cached, CapacityField::Assets, 1)?;

        let now = self.governance.clock.utc();
        let asset = Asset {
            id: AssetId::generate(),
            collection_id: request.collection_id.clone(),
            title,
            body,
            media_url,
            owner_id: actor.clone(),
            created_at: now,
            last_edited_at: now,
            moved_from: None,
        };
        let vault_id = &request.vault_id;
        let collection_path = paths::collection(vault_id, &request.collection_id);
        let asset_path = paths::asset(vault_id, &asset.id);
        let reads = [
            paths::counters(vault_id),
            collection_path.clone(),
            asset_path.clone(),
        ];

        run_transaction(store, &reads, |snapshot| -> Result<TxPlan<()>, Error> {
            if !snapshot.exists(&collection_path) {
                return Err(Error::not_found("Collection not found"));
            }
            let counters = counters_in(snapshot, vault_id)?;
            check_capacity(&plan, &counters, CapacityField::Assets, 1)?;
            if snapshot.exists(&asset_path) {
                return Err(Error::conflict("Asset already exists"));
            }
            Ok(TxPlan::new(
                vec![
                    WriteOp::put(asset_path.clone(), &asset)?,
                    write_counters(vault_id, &counters.adjusted(CapacityField::Assets, 1))?,
                ],
                (),
            ))
        })
        .await?;

        info!(vault_id = %vault_id, asset_id = %asset.id, "asset created");
        self.governance
            .audit
            .record_with_plan(
                vault_id,
                &plan,
                actor,
                AuditEventType::AssetCreated,
                json!({ "assetId": asset.id, "collectionId": asset.collection_id }),
            )
            .await;
        Ok(asset)
    }

    async fn delete_collection(
        &self,
        request: DeleteCollectionRequest,
    ) -> Result<DeleteCollectionResponse, Error> {
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        access.require_member()?;
        let store = self.governance.store.as_ref();
        let vault_id = &request.vault_id;
        let collection_id = &request.collection_id;
        let collection_path = paths::collection(vault_id, collection_id);
        if store.get(&collection_path).await?.is_none() {
            return Ok(DeleteCollectionResponse {
                collection_id: collection_id.clone(),
                deleted: false,
                assets_deleted: 0,
            });
        }
        access
            .require(store, Action::Delete, &[GrantTarget::collection(collection_id)])
            .await?;
        let actor = &request.caller.user_id;
        let plan = self
            .governance
            .quotas
            .consume(&access.vault, actor, QuotaKind::Destructive, 1)
            .await?;
        // Counters must exist before page transactions decrement them.
        self.governance.usage.ensure(vault_id).await?;

        let assets_query = Query::collection(paths::assets(vault_id))
            .where_eq("collectionId", collection_id.as_str())
            .limit(PURGE_PAGE_SIZE);
        let mut cursor = None;
        let mut assets_deleted = 0_u64;
        loop {
            let page = store
                .query(&assets_query.clone().start_after(cursor.take()))
                .await?;
            let fetched = page.len();
            let asset_paths: Vec<DocPath> = page.into_iter().map(|doc| doc.path).collect();
            let Some(last) = asset_paths.last().cloned() else {
                break;
            };
            assets_deleted += self.delete_asset_page(vault_id, &asset_paths).await?;
            for path in &asset_paths {
                purge_resource_grants(store, vault_id, GrantScope::Asset, path.id()).await;
            }
            if fetched < PURGE_PAGE_SIZE {
                break;
            }
            cursor = Some(last);
        }

        let reads = [collection_path.clone(), paths::counters(vault_id)];
        let deleted = run_transaction(store, &reads, |snapshot| -> Result<TxPlan<bool>, Error> {
            if !snapshot.exists(&collection_path) {
                return Ok(TxPlan::read_only(false));
            }
            let counters = counters_in(snapshot, vault_id)?.adjusted(CapacityField::Collections, -1);
            Ok(TxPlan::new(
                vec![
                    WriteOp::delete(collection_path.clone()),
                    write_counters(vault_id, &counters)?,
                ],
                true,
            ))
        })
        .await?;
        purge_resource_grants(store, vault_id, GrantScope::Collection, collection_id.as_str()).await;

        info!(vault_id = %vault_id, collection_id = %collection_id, assets_deleted, "collection deleted");
        self.governance
            .audit
            .record_with_plan(
                vault_id,
                &plan,
                actor,
                AuditEventType::CollectionDeleted,
                json!({ "collectionId": collection_id, "assetsDeleted": assets_deleted }),
            )
            .await;
        Ok(DeleteCollectionResponse {
            collection_id: collection_id.clone(),
            deleted,
            assets_deleted,
        })
    }

    async fn delete_asset(&self, request: DeleteAssetRequest) -> Result<DeleteAssetResponse, Error> {
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        access.require_member()?;
        let vault_id = &request.vault_id;
        let asset_id = &request.asset_id;
        let Some(asset) = self.load_asset(vault_id, asset_id).await? else {
            return Ok(DeleteAssetResponse {
                asset_id: asset_id.clone(),
                deleted: false,
            });
        };
        let store = self.governance.store.as_ref();
        access
            .require(
                store,
                Action::Delete,
                &[
                    GrantTarget::asset(asset_id),
                    GrantTarget::collection(&asset.collection_id),
                ],
            )
            .await?;
        let actor = &request.caller.user_id;
        let plan = self
            .governance
            .quotas
            .consume(&access.vault, actor, QuotaKind::Destructive, 1)
            .await?;
        self.governance.usage.ensure(vault_id).await?;

        let asset_path = paths::asset(vault_id, asset_id);
        let deleted = self
            .delete_asset_page(vault_id, std::slice::from_ref(&asset_path))
            .await?
            > 0;
        if deleted {
            purge_resource_grants(store, vault_id, GrantScope::Asset, asset_id.as_str()).await;
            info!(vault_id = %vault_id, asset_id = %asset_id, "asset deleted");
            self.governance
                .audit
                .record_with_plan(
                    vault_id,
                    &plan,
                    actor,
                    AuditEventType::AssetDeleted,
                    json!({ "assetId": asset_id, "collectionId": asset.collection_id }),
                )
                .await;
        }
        Ok(DeleteAssetResponse {
            asset_id: asset_id.clone(),
            deleted,
        })
    }
}

#[async_trait]
impl ResourceQuery for ResourceService {
    async fn list_collections(
        &self,
        request: ListCollectionsRequest,
    ) -> Result<Page<Collection>, Error> {
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        self.require_view(&access, &[]).await?;
        let limit = page_limit(request.limit);
        let collections = paths::collections(&request.vault_id);
        let cursor = request.cursor.as_deref().map(|id| collections.doc(id));
        let docs = self
            .governance
            .store
            .query(&Query::collection(collections).start_after(cursor).limit(limit))
            .await?;
        decode_page(docs, limit)
    }

    async fn list_assets(&self, request: ListAssetsRequest) -> Result<Page<Asset>, Error> {
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        let limit = page_limit(request.limit);
        let assets = paths::assets(&request.vault_id);
        let cursor = request.cursor.as_deref().map(|id| assets.doc(id));
        let mut query = Query::collection(assets).start_after(cursor).limit(limit);
        match &request.collection_id {
            Some(collection_id) => {
                self.require_view(&access, &[GrantTarget::collection(collection_id)])
                    .await?;
                query = query.where_eq("collectionId", collection_id.as_str());
            }
            None => self.require_view(&access, &[]).await?,
        }
        let docs = self.governance.store.query(&query).await?;
        decode_page(docs, limit)
    }

    async fn get_asset(&self, request: GetAssetRequest) -> Result<Asset, Error> {
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        access.require_member()?;
        let asset = self
            .load_asset(&request.vault_id, &request.asset_id)
            .await?
            .ok_or_else(|| Error::not_found("Asset not found"))?;
        self.require_view(
            &access,
            &[
                GrantTarget::asset(&asset.id),
                GrantTarget::collection(&asset.collection_id),
            ],
        )
        .await?;
        Ok(asset)
    }
}
