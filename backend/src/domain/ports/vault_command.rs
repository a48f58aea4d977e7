//! Driving ports for vault lifecycle and vault reads.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{
    Caller, Error, Membership, ResolvedPlan, TierLimits, UsageCounters, UserId, Vault, VaultId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateVaultRequest {
    pub caller: Caller,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVaultResponse {
    pub vault_id: VaultId,
    pub documents_deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOwnershipRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub new_owner_id: UserId,
}

/// A vault the caller belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultListing {
    pub vault: Vault,
    pub membership: Membership,
}

/// Limits and current usage for one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDetails {
    pub vault: Vault,
    pub membership: Membership,
    pub plan: ResolvedPlan,
    pub usage: UsageCounters,
    pub limits: LimitsView,
}

/// Client-facing projection of [`TierLimits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsView {
    pub max_members: u64,
    pub max_delegates: u64,
    pub max_assets: u64,
    pub max_collections: u64,
    pub max_write_ops_per_day: u64,
    pub max_destructive_ops_per_day: u64,
    pub max_invite_ops_per_day: u64,
    pub max_bulk_ops_per_day: u64,
}

impl From<TierLimits> for LimitsView {
    fn from(value: TierLimits) -> Self {
        Self {
            max_members: value.max_members(),
            max_delegates: value.max_delegates,
            max_assets: value.max_assets,
            max_collections: value.max_collections,
            max_write_ops_per_day: value.max_write_ops_per_day,
            max_destructive_ops_per_day: value.max_destructive_ops_per_day,
            max_invite_ops_per_day: value.max_invite_ops_per_day,
            max_bulk_ops_per_day: value.max_bulk_ops_per_day,
        }
    }
}

/// Vault creation, deletion and ownership changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VaultCommand: Send + Sync {
    async fn create_vault(&self, request: CreateVaultRequest) -> Result<Vault, Error>;

    /// Synchronously tear down the vault and everything under it.
    async fn delete_vault(&self, request: VaultRequest) -> Result<DeleteVaultResponse, Error>;

    async fn transfer_ownership(&self, request: TransferOwnershipRequest) -> Result<Vault, Error>;
}

/// Vault reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VaultQuery: Send + Sync {
    async fn list_vaults(&self, caller: Caller) -> Result<Vec<VaultListing>, Error>;

    async fn describe_vault(&self, request: VaultRequest) -> Result<VaultDetails, Error>;
}
