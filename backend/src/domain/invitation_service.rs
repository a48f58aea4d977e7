//! Invitation lifecycle: issue, accept, revoke and list.
//!
//! Expiry is lazy. Whichever operation first reads a pending invitation past
//! its TTL persists `EXPIRED` before reporting `410`.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::access::load_vault;
use crate::domain::audit::AuditEventType;
use crate::domain::governance::Governance;
use crate::domain::invitation::{generate_code, validate_email};
use crate::domain::paths;
use crate::domain::plans::payment_required;
use crate::domain::ports::{
    AcceptInvitationRequest, AcceptInvitationResponse, CreateInvitationRequest,
    CreateInvitationResponse, DocPath, InvitationCommand, InvitationRequest,
    ListInvitationsRequest, MAX_WRITE_GROUP_SIZE, Query, TxPlan, TxSnapshot, WriteOp,
    encode_value, run_transaction,
};
use crate::domain::purge::scan_all;
use crate::domain::usage::{check_capacity, counters_in, write_counters};
use crate::domain::{
    CapacityField, Error, Invitation, InvitationStatus, Membership, PermissionFlags, QuotaKind,
    Role, Vault,
};

/// Result of a transaction that may have only persisted lazy expiry.
enum Settled<T> {
    Done(T),
    Expired,
}

enum Acceptance {
    Joined(Membership),
    AlreadyMember(Membership),
}

fn expired() -> Error {
    Error::gone("Invitation has expired")
}

fn pending_invitation(
    snapshot: &TxSnapshot,
    path: &DocPath,
) -> Result<Invitation, Error> {
    snapshot
        .decode::<Invitation>(path)?
        .ok_or_else(|| Error::not_found("Invitation not found"))
}

/// Implements [`InvitationCommand`].
#[derive(Clone)]
pub struct InvitationService {
    governance: Governance,
}

impl InvitationService {
    pub fn new(governance: Governance) -> Self {
        Self { governance }
    }

    async fn owner_email(&self, vault: &Vault) -> Option<String> {
        let path = paths::member(&vault.id, &vault.owner_id);
        match self.governance.store.get(&path).await {
            Ok(Some(doc)) => doc.decode::<Membership>().ok().and_then(|owner| owner.email),
            Ok(None) => None,
            Err(error) => {
                warn!(vault_id = %vault.id, %error, "could not read owner membership");
                None
            }
        }
    }
}

#[async_trait]
impl InvitationCommand for InvitationService {
    async fn create_invitation(
        &self,
        request: CreateInvitationRequest,
    ) -> Result<CreateInvitationResponse, Error> {
        let CreateInvitationRequest {
            caller,
            vault_id,
            email,
            permissions,
        } = request;
        let email = validate_email(&email)?;
        let access = self.governance.access(&vault_id, &caller).await?;
        access.require_owner()?;
        if caller
            .email
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(&email))
        {
            return Err(Error::invalid_request("You cannot invite yourself"));
        }
        let plan = self.governance.plans.assert_paid(&access.vault).await?;
        self.governance
            .quotas
            .consume_with_plan(&vault_id, &plan, &caller.user_id, QuotaKind::Invite, 1)
            .await?;
        let usage = self.governance.usage.ensure(&vault_id).await?;
        check_capacity(&plan, &usage, CapacityField::Delegates, 1)?;

        let code = generate_code(&vault_id).map_err(|error| {
            Error::internal("Could not generate invitation code")
                .with_details(json!({ "reason": error.to_string() }))
        })?;
        let invitation = Invitation::pending(
            code,
            email,
            caller.user_id.clone(),
            permissions.unwrap_or(PermissionFlags::VIEW_ONLY),
            self.governance.clock.utc(),
        );
        let created = self
            .governance
            .store
            .create_if_absent(&paths::invitation(&invitation.code), encode_value(&invitation)?)
            .await?;
        if !created {
            return Err(Error::conflict("Invitation code collision; retry the request"));
        }

        info!(vault_id = %vault_id, code = %invitation.code, "invitation created");
        let email_sent = self
            .governance
            .notifier
            .send_invitation(&invitation, &access.vault, caller.email.as_deref())
            .await
            .was_sent();
        self.governance
            .audit
            .record_with_plan(
                &vault_id,
                &plan,
                &caller.user_id,
                AuditEventType::InvitationCreated,
                json!({ "code": invitation.code, "email": invitation.email, "emailSent": email_sent }),
            )
            .await;
        Ok(CreateInvitationResponse {
            invitation,
            email_sent,
        })
    }

    async fn accept_invitation(
        &self,
        request: AcceptInvitationRequest,
    ) -> Result<AcceptInvitationResponse, Error> {
        let AcceptInvitationRequest { caller, code } = request;
        let store = self.governance.store.as_ref();
        let vault = load_vault(store, code.vault_id()).await?;
        let plan = self.governance.plans.resolve(&vault).await?;
        self.governance.usage.ensure(&vault.id).await?;

        let invitation_path = paths::invitation(&code);
        let member_path = paths::member(&vault.id, &caller.user_id);
        let reads = [
            invitation_path.clone(),
            member_path.clone(),
            paths::counters(&vault.id),
        ];
        let now = self.governance.clock.utc();

        let settled = run_transaction(
            store,
            &reads,
            |snapshot| -> Result<TxPlan<Settled<(Invitation, Acceptance)>>, Error> {
                let mut invitation = pending_invitation(snapshot, &invitation_path)?;
                if invitation.expire_if_lapsed(now) {
                    return Ok(TxPlan::new(
                        vec![WriteOp::put(invitation_path.clone(), &invitation)?],
                        Settled::Expired,
                    ));
                }
                let existing: Option<Membership> = snapshot.decode(&member_path)?;
                match invitation.status {
                    InvitationStatus::Pending => {}
                    InvitationStatus::Accepted
                        if invitation.accepted_by.as_ref() == Some(&caller.user_id) =>
                    {
                        if let Some(membership) = existing.filter(Membership::is_active) {
                            return Ok(TxPlan::read_only(Settled::Done((
                                invitation,
                                Acceptance::AlreadyMember(membership),
                            ))));
                        }
                        return Err(Error::conflict("Invitation has already been used"));
                    }
                    InvitationStatus::Accepted => {
                        return Err(Error::conflict("Invitation has already been used"));
                    }
                    InvitationStatus::Revoked => {
                        return Err(Error::conflict("Invitation has been revoked"));
                    }
                    InvitationStatus::Expired => return Err(expired()),
                }
                let addressed = caller
                    .email
                    .as_deref()
                    .is_some_and(|email| invitation.is_addressed_to(email));
                if !addressed {
                    return Err(Error::forbidden(
                        "Invitation was issued to a different email address",
                    ));
                }

                invitation.status = InvitationStatus::Accepted;
                invitation.accepted_by = Some(caller.user_id.clone());
                invitation.accepted_at = Some(now);
                let mut writes = vec![WriteOp::put(invitation_path.clone(), &invitation)?];

                let acceptance = match existing.filter(Membership::is_active) {
                    Some(membership) => Acceptance::AlreadyMember(membership),
                    None => {
                        if !plan.paid {
                            return Err(payment_required(&plan));
                        }
                        let counters = counters_in(snapshot, &vault.id)?;
                        check_capacity(&plan, &counters, CapacityField::Delegates, 1)?;
                        let membership = Membership::delegate(
                            caller.user_id.clone(),
                            caller.email.clone(),
                            invitation.permissions,
                            now,
                        );
                        writes.push(WriteOp::put(member_path.clone(), &membership)?);
                        writes.push(write_counters(
                            &vault.id,
                            &counters.adjusted(CapacityField::Delegates, 1),
                        )?);
                        Acceptance::Joined(membership)
                    }
                };
                Ok(TxPlan::new(writes, Settled::Done((invitation, acceptance))))
            },
        )
        .await?;

        let (invitation, acceptance) = match settled {
            Settled::Done(done) => done,
            Settled::Expired => {
                info!(vault_id = %vault.id, %code, "invitation expired on accept");
                return Err(expired());
            }
        };
        let (membership, already_member) = match acceptance {
            Acceptance::AlreadyMember(membership) => (membership, true),
            Acceptance::Joined(membership) => {
                info!(vault_id = %vault.id, user_id = %caller.user_id, "invitation accepted");
                self.governance
                    .audit
                    .record_with_plan(
                        &vault.id,
                        &plan,
                        &caller.user_id,
                        AuditEventType::InvitationAccepted,
                        json!({ "code": invitation.code, "role": Role::Delegate }),
                    )
                    .await;
                let owner_email = self.owner_email(&vault).await;
                self.governance
                    .notifier
                    .send_acceptance(&vault, owner_email.as_deref(), &invitation)
                    .await;
                (membership, false)
            }
        };
        Ok(AcceptInvitationResponse {
            vault_id: vault.id,
            membership,
            already_member,
        })
    }

    async fn revoke_invitation(&self, request: InvitationRequest) -> Result<Invitation, Error> {
        let InvitationRequest { caller, code } = request;
        let access = self.governance.access(code.vault_id(), &caller).await?;
        access.require_owner()?;
        let invitation_path = paths::invitation(&code);
        let now = self.governance.clock.utc();

        let settled = run_transaction(
            self.governance.store.as_ref(),
            std::slice::from_ref(&invitation_path),
            |snapshot| -> Result<TxPlan<Settled<Invitation>>, Error> {
                let mut invitation = pending_invitation(snapshot, &invitation_path)?;
                if invitation.expire_if_lapsed(now) {
                    return Ok(TxPlan::new(
                        vec![WriteOp::put(invitation_path.clone(), &invitation)?],
                        Settled::Expired,
                    ));
                }
                match invitation.status {
                    InvitationStatus::Pending => {}
                    InvitationStatus::Revoked => {
                        return Err(Error::conflict("Invitation already revoked"));
                    }
                    InvitationStatus::Accepted => {
                        return Err(Error::conflict("Invitation has already been accepted"));
                    }
                    InvitationStatus::Expired => return Err(expired()),
                }
                invitation.status = InvitationStatus::Revoked;
                invitation.revoked_at = Some(now);
                Ok(TxPlan::new(
                    vec![WriteOp::put(invitation_path.clone(), &invitation)?],
                    Settled::Done(invitation),
                ))
            },
        )
        .await?;

        let Settled::Done(invitation) = settled else {
            return Err(expired());
        };
        info!(vault_id = %invitation.vault_id, %code, "invitation revoked");
        self.governance
            .audit
            .record_vault_event(
                &access.vault,
                &caller.user_id,
                AuditEventType::InvitationRevoked,
                json!({ "code": invitation.code, "email": invitation.email }),
            )
            .await;
        Ok(invitation)
    }

    async fn list_invitations(
        &self,
        request: ListInvitationsRequest,
    ) -> Result<Vec<Invitation>, Error> {
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        access.require_owner()?;
        let store = self.governance.store.as_ref();
        let docs = scan_all(store, &Query::collection(paths::invitations(&request.vault_id))).await?;
        let now = self.governance.clock.utc();

        let mut invitations = Vec::with_capacity(docs.len());
        let mut lapsed = Vec::new();
        for doc in docs {
            let mut invitation: Invitation = doc.decode()?;
            if invitation.expire_if_lapsed(now) {
                lapsed.push(WriteOp::merge(
                    doc.path,
                    json!({ "status": InvitationStatus::Expired }),
                ));
            }
            invitations.push(invitation);
        }
        // Expiry is re-derived on every read, so a lost write only delays it.
        while !lapsed.is_empty() {
            let rest = lapsed.split_off(lapsed.len().min(MAX_WRITE_GROUP_SIZE));
            let count = lapsed.len();
            if let Err(error) = store.batch_write(lapsed).await {
                warn!(vault_id = %request.vault_id, %error, count, "could not persist invitation expiry");
            }
            lapsed = rest;
        }
        Ok(invitations)
    }
}
