//! Driving port for memberships and scoped grants.

use async_trait::async_trait;

use crate::domain::{
    Caller, Error, GrantScope, Membership, PermissionFlags, PermissionGrant, UserId, VaultId,
};

/// Targets one member of a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePermissionsRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub user_id: UserId,
    pub permissions: PermissionFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub user_id: UserId,
    pub scope: GrantScope,
    pub scope_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertGrantRequest {
    pub grant: GrantRequest,
    pub permissions: PermissionFlags,
}

/// Membership management.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipCommand: Send + Sync {
    async fn list_members(&self, caller: Caller, vault_id: VaultId)
    -> Result<Vec<Membership>, Error>;

    /// Owner revokes a delegate, or a delegate leaves.
    async fn remove_member(&self, request: MemberRequest) -> Result<Membership, Error>;

    async fn update_permissions(
        &self,
        request: UpdatePermissionsRequest,
    ) -> Result<Membership, Error>;

    async fn upsert_grant(&self, request: UpsertGrantRequest) -> Result<PermissionGrant, Error>;

    /// Idempotent; returns whether a grant existed.
    async fn delete_grant(&self, request: GrantRequest) -> Result<bool, Error>;
}
