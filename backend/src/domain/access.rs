//! Loading a caller's standing in a vault and gating actions on it.

use serde_json::json;

use super::paths;
use super::permissions::DenialReason;
use super::ports::DocumentStore;
use super::{
    Action, AssetId, Caller, CollectionId, Decision, Error, GrantScope, Membership,
    PermissionContext, PermissionGrant, Role, UserId, Vault, VaultId, can_perform,
};

/// A resource whose scoped grants may lift a baseline denial.
#[derive(Debug, Clone, Copy)]
pub struct GrantTarget<'a> {
    /// Kind of resource the grant is keyed on.
    pub scope: GrantScope,
    /// Collection or asset id within the vault.
    pub id: &'a str,
}

impl<'a> GrantTarget<'a> {
    /// Grants scoped to the collection `id`.
    pub fn collection(id: &'a CollectionId) -> Self {
        Self {
            scope: GrantScope::Collection,
            id: id.as_str(),
        }
    }

    /// Grants scoped to the asset `id`.
    pub fn asset(id: &'a AssetId) -> Self {
        Self {
            scope: GrantScope::Asset,
            id: id.as_str(),
        }
    }
}

/// The vault record and the caller's membership in it.
#[derive(Debug, Clone)]
pub struct VaultAccess {
    pub vault: Vault,
    /// `None` when the caller has never been a member.
    pub membership: Option<Membership>,
    /// The caller.
    pub user_id: UserId,
}

/// Fetch the vault document, failing with `404` if it does not exist.
pub async fn load_vault(store: &dyn DocumentStore, vault_id: &VaultId) -> Result<Vault, Error> {
    let doc = store
        .get(&paths::vault(vault_id))
        .await?
        .ok_or_else(|| {
            Error::not_found("Vault not found").with_details(json!({ "vaultId": vault_id }))
        })?;
    Ok(doc.decode()?)
}

impl VaultAccess {
    /// Load the vault and the caller's membership.
    ///
    /// Vaults created before membership documents existed only record an
    /// `ownerId`; the recorded owner is treated as an active owner member.
    pub async fn load(
        store: &dyn DocumentStore,
        vault_id: &VaultId,
        caller: &Caller,
    ) -> Result<Self, Error> {
        let vault = load_vault(store, vault_id).await?;
        let membership = match store.get(&paths::member(vault_id, &caller.user_id)).await? {
            Some(doc) => Some(doc.decode::<Membership>()?),
            None if vault.owner_id == caller.user_id => Some(Membership::owner(
                caller.user_id.clone(),
                caller.email.clone(),
                vault.created_at,
            )),
            None => None,
        };
        Ok(Self {
            vault,
            membership,
            user_id: caller.user_id.clone(),
        })
    }

    /// Caller holds an active owner membership.
    pub fn is_owner(&self) -> bool {
        self.membership
            .as_ref()
            .is_some_and(|membership| membership.is_active() && membership.role == Role::Owner)
    }

    /// Require an active membership of any role.
    pub fn require_member(&self) -> Result<&Membership, Error> {
        match self.membership.as_ref() {
            None => Err(DenialReason::NotMember.into()),
            Some(membership) if !membership.is_active() => {
                Err(DenialReason::MembershipInactive.into())
            }
            Some(membership) => Ok(membership),
        }
    }

    /// Require the active owner role.
    pub fn require_owner(&self) -> Result<(), Error> {
        self.require_member()?;
        if self.is_owner() {
            Ok(())
        } else {
            Err(Error::forbidden("Owner role required"))
        }
    }

    fn context<'a>(&'a self, grants: &'a [PermissionGrant]) -> PermissionContext<'a> {
        PermissionContext {
            membership: self.membership.as_ref(),
            grants,
            is_vault_owner: self.vault.owner_id == self.user_id,
        }
    }

    /// Require `action`, consulting scoped grants on `targets` only when the
    /// baseline denies for lack of the capability.
    pub async fn require(
        &self,
        store: &dyn DocumentStore,
        action: Action,
        targets: &[GrantTarget<'_>],
    ) -> Result<(), Error> {
        match can_perform(self.context(&[]), action) {
            Decision::Allowed => return Ok(()),
            Decision::Denied(DenialReason::PermissionRequired(_)) if !targets.is_empty() => {}
            denied @ Decision::Denied(_) => return denied.into_result(),
        }
        let mut grants = Vec::with_capacity(targets.len());
        for target in targets {
            let path = paths::grant(&self.vault.id, target.scope, target.id, &self.user_id);
            if let Some(doc) = store.get(&path).await? {
                grants.push(doc.decode::<PermissionGrant>()?);
            }
        }
        can_perform(self.context(&grants), action).into_result()
    }
}
