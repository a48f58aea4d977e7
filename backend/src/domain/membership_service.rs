//! Membership management and resource-scoped grants.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::access::VaultAccess;
use crate::domain::audit::AuditEventType;
use crate::domain::governance::Governance;
use crate::domain::paths;
use crate::domain::ports::{
    DocPath, GrantRequest, MemberRequest, MembershipCommand, Query, TxPlan, UpdatePermissionsRequest,
    UpsertGrantRequest, WriteOp, run_transaction,
};
use crate::domain::purge::{purge_user_grants, scan_all};
use crate::domain::usage::{counters_in, write_counters};
use crate::domain::{
    AssetId, Caller, CapacityField, CollectionId, Error, GrantScope, Membership,
    MembershipStatus, PermissionGrant, Role, VaultId,
};

/// Implements [`MembershipCommand`].
#[derive(Clone)]
pub struct MembershipService {
    governance: Governance,
}

/// Path of the resource a grant is scoped to, validating its id.
fn grant_resource(vault_id: &VaultId, scope: GrantScope, scope_id: &str) -> Result<DocPath, Error> {
    let invalid = |error: crate::domain::IdValidationError| {
        Error::invalid_request(error.to_string()).with_details(json!({ "field": "scopeId" }))
    };
    Ok(match scope {
        GrantScope::Collection => {
            paths::collection(vault_id, &CollectionId::new(scope_id).map_err(invalid)?)
        }
        GrantScope::Asset => paths::asset(vault_id, &AssetId::new(scope_id).map_err(invalid)?),
    })
}

fn member_not_found() -> Error {
    Error::not_found("Member not found")
}

impl MembershipService {
    pub fn new(governance: Governance) -> Self {
        Self { governance }
    }

    /// Owner access plus a paid plan, required for every delegate feature.
    async fn paid_owner(&self, vault_id: &VaultId, caller: &Caller) -> Result<VaultAccess, Error> {
        let access = self.governance.access(vault_id, caller).await?;
        access.require_owner()?;
        self.governance.plans.assert_paid(&access.vault).await?;
        Ok(access)
    }
}

#[async_trait]
impl MembershipCommand for MembershipService {
    async fn list_members(&self, caller: Caller, vault_id: VaultId) -> Result<Vec<Membership>, Error> {
        let access = self.governance.access(&vault_id, &caller).await?;
        access.require_member()?;
        let docs = scan_all(
            self.governance.store.as_ref(),
            &Query::collection(paths::members(&vault_id)),
        )
        .await?;
        let mut members = docs
            .iter()
            .map(|doc| doc.decode::<Membership>())
            .collect::<Result<Vec<_>, _>>()?;
        let owner_id = &access.vault.owner_id;
        if !members.iter().any(|member| &member.user_id == owner_id) {
            members.insert(
                0,
                Membership::owner(owner_id.clone(), None, access.vault.created_at),
            );
        }
        Ok(members)
    }

    async fn remove_member(&self, request: MemberRequest) -> Result<Membership, Error> {
        let MemberRequest {
            caller,
            vault_id,
            user_id,
        } = request;
        let access = self.governance.access(&vault_id, &caller).await?;
        let leaving = user_id == caller.user_id;
        if leaving {
            access.require_member()?;
            if access.is_owner() {
                return Err(Error::conflict(
                    "Owners cannot leave their vault; transfer ownership first",
                ));
            }
        } else {
            access.require_owner()?;
        }
        self.governance.usage.ensure(&vault_id).await?;

        let member_path = paths::member(&vault_id, &user_id);
        let reads = [member_path.clone(), paths::counters(&vault_id)];
        let now = self.governance.clock.utc();
        let removed = run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<Membership>, Error> {
                let mut membership: Membership = snapshot
                    .decode(&member_path)?
                    .ok_or_else(member_not_found)?;
                if membership.role == Role::Owner {
                    return Err(Error::conflict("The vault owner cannot be removed"));
                }
                if !membership.is_active() {
                    return Err(Error::conflict("Member has already been revoked"));
                }
                let counters = counters_in(snapshot, &vault_id)?
                    .adjusted(CapacityField::Delegates, -1);
                membership.status = MembershipStatus::Revoked;
                membership.updated_at = now;
                Ok(TxPlan::new(
                    vec![
                        WriteOp::put(member_path.clone(), &membership)?,
                        write_counters(&vault_id, &counters)?,
                    ],
                    membership,
                ))
            },
        )
        .await?;

        if let Err(error) =
            purge_user_grants(self.governance.store.as_ref(), &vault_id, &user_id).await
        {
            warn!(vault_id = %vault_id, user_id = %user_id, %error, "grant cleanup after removal failed");
        }
        let event_type = if leaving {
            AuditEventType::MemberLeft
        } else {
            AuditEventType::MemberRevoked
        };
        info!(vault_id = %vault_id, user_id = %user_id, leaving, "membership revoked");
        self.governance
            .audit
            .record_vault_event(&access.vault, &caller.user_id, event_type, json!({ "userId": user_id }))
            .await;
        Ok(removed)
    }

    async fn update_permissions(
        &self,
        request: UpdatePermissionsRequest,
    ) -> Result<Membership, Error> {
        let UpdatePermissionsRequest {
            caller,
            vault_id,
            user_id,
            permissions,
        } = request;
        let access = self.paid_owner(&vault_id, &caller).await?;
        let member_path = paths::member(&vault_id, &user_id);
        let now = self.governance.clock.utc();

        let updated = run_transaction(
            self.governance.store.as_ref(),
            std::slice::from_ref(&member_path),
            |snapshot| -> Result<TxPlan<Membership>, Error> {
                let mut membership: Membership = snapshot
                    .decode(&member_path)?
                    .ok_or_else(member_not_found)?;
                if membership.role == Role::Owner {
                    return Err(Error::conflict("Owner permissions cannot be changed"));
                }
                if !membership.is_active() {
                    return Err(Error::conflict("Member has been revoked"));
                }
                membership.permissions = permissions;
                membership.updated_at = now;
                Ok(TxPlan::new(
                    vec![WriteOp::put(member_path.clone(), &membership)?],
                    membership,
                ))
            },
        )
        .await?;

        self.governance
            .audit
            .record_vault_event(
                &access.vault,
                &caller.user_id,
                AuditEventType::PermissionsUpdated,
                json!({ "userId": user_id, "permissions": permissions }),
            )
            .await;
        Ok(updated)
    }

    async fn upsert_grant(&self, request: UpsertGrantRequest) -> Result<PermissionGrant, Error> {
        let UpsertGrantRequest { grant, permissions } = request;
        let access = self.paid_owner(&grant.vault_id, &grant.caller).await?;
        let resource_path = grant_resource(&grant.vault_id, grant.scope, &grant.scope_id)?;
        let member_path = paths::member(&grant.vault_id, &grant.user_id);
        let grant_path = paths::grant(&grant.vault_id, grant.scope, &grant.scope_id, &grant.user_id);
        let reads = [resource_path.clone(), member_path.clone()];
        let record = PermissionGrant {
            scope: grant.scope,
            scope_id: grant.scope_id.clone(),
            user_id: grant.user_id.clone(),
            permissions,
            updated_at: self.governance.clock.utc(),
        };

        run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<()>, Error> {
                if !snapshot.exists(&resource_path) {
                    return Err(Error::not_found("Resource not found").with_details(json!({
                        "scope": grant.scope,
                        "scopeId": grant.scope_id,
                    })));
                }
                let member = snapshot
                    .decode::<Membership>(&member_path)?
                    .filter(Membership::is_active_delegate);
                if member.is_none() {
                    return Err(Error::not_found("Grants can only target active delegates"));
                }
                Ok(TxPlan::new(vec![WriteOp::put(grant_path.clone(), &record)?], ()))
            },
        )
        .await?;

        self.governance
            .audit
            .record_vault_event(
                &access.vault,
                &grant.caller.user_id,
                AuditEventType::GrantUpdated,
                json!({
                    "userId": grant.user_id,
                    "scope": grant.scope,
                    "scopeId": grant.scope_id,
                    "permissions": permissions,
                }),
            )
            .await;
        Ok(record)
    }

    async fn delete_grant(&self, request: GrantRequest) -> Result<bool, Error> {
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        access.require_owner()?;
        let path = paths::grant(
            &request.vault_id,
            request.scope,
            &request.scope_id,
            &request.user_id,
        );
        let store = self.governance.store.as_ref();
        if store.get(&path).await?.is_none() {
            return Ok(false);
        }
        store.delete(&path).await?;
        self.governance
            .audit
            .record_vault_event(
                &access.vault,
                &request.caller.user_id,
                AuditEventType::GrantDeleted,
                json!({
                    "userId": request.user_id,
                    "scope": request.scope,
                    "scopeId": request.scope_id,
                }),
            )
            .await;
        Ok(true)
    }
}
