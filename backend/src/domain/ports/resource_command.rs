//! Driving ports for collections and assets.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{
    Asset, AssetId, Caller, Collection, CollectionId, Error, Page, VaultId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCollectionRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAssetRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub collection_id: CollectionId,
    pub title: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCollectionRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub collection_id: CollectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCollectionResponse {
    pub collection_id: CollectionId,
    /// `false` when the collection did not exist.
    pub deleted: bool,
    pub assets_deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAssetRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub asset_id: AssetId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAssetResponse {
    pub asset_id: AssetId,
    /// `false` when the asset did not exist.
    pub deleted: bool,
}

/// Resource mutations gated by permissions, quotas and capacity caps.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceCommand: Send + Sync {
    async fn create_collection(&self, request: CreateCollectionRequest)
    -> Result<Collection, Error>;

    async fn create_asset(&self, request: CreateAssetRequest) -> Result<Asset, Error>;

    async fn delete_collection(
        &self,
        request: DeleteCollectionRequest,
    ) -> Result<DeleteCollectionResponse, Error>;

    async fn delete_asset(&self, request: DeleteAssetRequest) -> Result<DeleteAssetResponse, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCollectionsRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub cursor: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAssetsRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub collection_id: Option<CollectionId>,
    pub cursor: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAssetRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub asset_id: AssetId,
}

/// Resource reads gated by the View capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceQuery: Send + Sync {
    async fn list_collections(
        &self,
        request: ListCollectionsRequest,
    ) -> Result<Page<Collection>, Error>;

    async fn list_assets(&self, request: ListAssetsRequest) -> Result<Page<Asset>, Error>;

    async fn get_asset(&self, request: GetAssetRequest) -> Result<Asset, Error>;
}
