//! Driving port for cross-vault moves.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Asset, AssetId, Caller, CollectionId, Error, JobId, MoveJob, VaultId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveAssetRequest {
    pub caller: Caller,
    pub source_vault_id: VaultId,
    pub asset_id: AssetId,
    pub target_vault_id: VaultId,
    pub target_collection_id: CollectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveAssetResponse {
    pub asset: Asset,
    pub source_vault_id: VaultId,
    pub target_vault_id: VaultId,
    /// A new id was minted because the original collided in the target.
    pub renamed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCollectionRequest {
    pub caller: Caller,
    pub source_vault_id: VaultId,
    pub collection_id: CollectionId,
    pub target_vault_id: VaultId,
}

/// Identifies a move job stored under its source vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveJobRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub job_id: JobId,
}

/// Relocation of assets and collections between vaults.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MoveCommand: Send + Sync {
    async fn move_asset(&self, request: MoveAssetRequest) -> Result<MoveAssetResponse, Error>;

    /// Start a collection move and drive it as far as it will go.
    async fn move_collection(&self, request: MoveCollectionRequest) -> Result<MoveJob, Error>;

    /// Continue a failed or interrupted collection move.
    async fn resume_move(&self, request: MoveJobRequest) -> Result<MoveJob, Error>;

    async fn move_job(&self, request: MoveJobRequest) -> Result<MoveJob, Error>;
}
