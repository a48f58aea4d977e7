//! Vault lifecycle: creation, teardown, ownership transfer and reads.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::audit::AuditEventType;
use crate::domain::deletion::delete_vault_tree;
use crate::domain::governance::Governance;
use crate::domain::paths;
use crate::domain::ports::{
    CreateVaultRequest, DeleteVaultResponse, Query, TransferOwnershipRequest, TxPlan,
    VaultCommand, VaultDetails, VaultListing, VaultQuery, VaultRequest, WriteOp, run_transaction,
};
use crate::domain::purge::scan_all;
use crate::domain::vault::{NAME_MAX_LEN, required_text};
use crate::domain::{
    Caller, Error, Membership, PermissionFlags, Role, UsageCounters, Vault, VaultId,
};

/// Implements [`VaultCommand`] and [`VaultQuery`].
#[derive(Clone)]
pub struct VaultService {
    governance: Governance,
}

impl VaultService {
    pub fn new(governance: Governance) -> Self {
        Self { governance }
    }

    async fn active_memberships(&self, caller: &Caller) -> Result<Vec<(VaultId, Membership)>, Error> {
        let query = Query::group(paths::MEMBERS)
            .where_eq("userId", caller.user_id.as_str())
            .where_eq("status", "ACTIVE");
        let docs = scan_all(self.governance.store.as_ref(), &query).await?;
        let mut memberships = Vec::with_capacity(docs.len());
        for doc in docs {
            if let Some(vault_id) = paths::vault_id_of(&doc.path) {
                memberships.push((vault_id, doc.decode::<Membership>()?));
            }
        }
        Ok(memberships)
    }
}

#[async_trait]
impl VaultCommand for VaultService {
    async fn create_vault(&self, request: CreateVaultRequest) -> Result<Vault, Error> {
        let CreateVaultRequest { caller, name } = request;
        let name = required_text("name", &name, NAME_MAX_LEN)?;
        let now = self.governance.clock.utc();
        let vault = Vault {
            id: VaultId::generate(),
            owner_id: caller.user_id.clone(),
            name,
            created_at: now,
            updated_at: now,
        };
        let owner = Membership::owner(caller.user_id.clone(), caller.email.clone(), now);
        let vault_path = paths::vault(&vault.id);
        let reads = [vault_path.clone()];

        run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<()>, Error> {
                if snapshot.exists(&vault_path) {
                    return Err(Error::conflict("Vault already exists"));
                }
                Ok(TxPlan::new(
                    vec![
                        WriteOp::put(vault_path.clone(), &vault)?,
                        WriteOp::put(paths::member(&vault.id, &caller.user_id), &owner)?,
                        WriteOp::put(paths::counters(&vault.id), &UsageCounters::default())?,
                    ],
                    (),
                ))
            },
        )
        .await?;

        info!(vault_id = %vault.id, owner_id = %vault.owner_id, "vault created");
        self.governance
            .audit
            .record_vault_event(&vault, &caller.user_id, AuditEventType::VaultCreated, json!({ "name": vault.name }))
            .await;
        Ok(vault)
    }

    async fn delete_vault(&self, request: VaultRequest) -> Result<DeleteVaultResponse, Error> {
        let access = self.governance.access(&request.vault_id, &request.caller).await?;
        access.require_owner()?;
        self.governance
            .audit
            .record_user_event(
                &request.caller.user_id,
                AuditEventType::VaultDeleted,
                json!({ "vaultId": request.vault_id, "name": access.vault.name }),
            )
            .await;
        let documents_deleted =
            delete_vault_tree(self.governance.store.as_ref(), &request.vault_id).await?;
        Ok(DeleteVaultResponse {
            vault_id: request.vault_id,
            documents_deleted,
        })
    }

    async fn transfer_ownership(&self, request: TransferOwnershipRequest) -> Result<Vault, Error> {
        let TransferOwnershipRequest {
            caller,
            vault_id,
            new_owner_id,
        } = request;
        let access = self.governance.access(&vault_id, &caller).await?;
        access.require_owner()?;
        if new_owner_id == caller.user_id {
            return Err(Error::invalid_request("You already own this vault"));
        }

        let now = self.governance.clock.utc();
        let vault_path = paths::vault(&vault_id);
        let old_path = paths::member(&vault_id, &caller.user_id);
        let new_path = paths::member(&vault_id, &new_owner_id);
        let reads = [vault_path.clone(), old_path.clone(), new_path.clone()];

        let vault = run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<Vault>, Error> {
                let mut vault: Vault = snapshot
                    .decode(&vault_path)?
                    .ok_or_else(|| Error::not_found("Vault not found"))?;
                if vault.owner_id != caller.user_id {
                    return Err(Error::conflict("Vault ownership changed concurrently"));
                }
                let mut incoming: Membership = snapshot
                    .decode(&new_path)?
                    .filter(Membership::is_active)
                    .ok_or_else(|| {
                        Error::conflict("New owner must be an active member of the vault")
                    })?;
                let mut outgoing: Membership = snapshot.decode(&old_path)?.unwrap_or_else(|| {
                    Membership::owner(caller.user_id.clone(), caller.email.clone(), vault.created_at)
                });

                outgoing.role = Role::Delegate;
                outgoing.permissions = PermissionFlags::ALL;
                outgoing.updated_at = now;
                incoming.role = Role::Owner;
                incoming.permissions = PermissionFlags::ALL;
                incoming.updated_at = now;
                vault.owner_id = new_owner_id.clone();
                vault.updated_at = now;

                Ok(TxPlan::new(
                    vec![
                        WriteOp::put(vault_path.clone(), &vault)?,
                        WriteOp::put(old_path.clone(), &outgoing)?,
                        WriteOp::put(new_path.clone(), &incoming)?,
                    ],
                    vault,
                ))
            },
        )
        .await?;

        info!(vault_id = %vault_id, from = %caller.user_id, to = %new_owner_id, "vault ownership transferred");
        self.governance
            .audit
            .record_vault_event(
                &vault,
                &caller.user_id,
                AuditEventType::OwnershipTransferred,
                json!({ "from": caller.user_id, "to": new_owner_id }),
            )
            .await;
        Ok(vault)
    }
}

#[async_trait]
impl VaultQuery for VaultService {
    async fn list_vaults(&self, caller: Caller) -> Result<Vec<VaultListing>, Error> {
        let store = self.governance.store.as_ref();
        let mut seen = BTreeSet::new();
        let mut listings = Vec::new();
        for (vault_id, membership) in self.active_memberships(&caller).await? {
            let Some(doc) = store.get(&paths::vault(&vault_id)).await? else {
                continue;
            };
            seen.insert(vault_id);
            listings.push(VaultListing {
                vault: doc.decode()?,
                membership,
            });
        }

        let legacy = Query::collection(paths::vaults()).where_eq("ownerId", caller.user_id.as_str());
        for doc in scan_all(store, &legacy).await? {
            let vault: Vault = doc.decode()?;
            if seen.insert(vault.id.clone()) {
                let membership =
                    Membership::owner(caller.user_id.clone(), caller.email.clone(), vault.created_at);
                listings.push(VaultListing { vault, membership });
            }
        }
        Ok(listings)
    }

    async fn describe_vault(&self, request: VaultRequest) -> Result<VaultDetails, Error> {
        let access = self.governance.access(&request.vault_id, &request.caller).await?;
        let membership = access.require_member()?.clone();
        let plan = self.governance.plans.resolve(&access.vault).await?;
        let usage = self.governance.usage.ensure(&request.vault_id).await?;
        Ok(VaultDetails {
            vault: access.vault,
            membership,
            plan,
            usage,
            limits: plan.limits().into(),
        })
    }
}
