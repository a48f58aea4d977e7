//! Driving port for the invitation lifecycle.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{
    Caller, Error, Invitation, InvitationCode, Membership, PermissionFlags, VaultId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInvitationRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
    pub email: String,
    /// Baseline flags the delegate receives; view-only when omitted.
    pub permissions: Option<PermissionFlags>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationResponse {
    pub invitation: Invitation,
    pub email_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptInvitationRequest {
    pub caller: Caller,
    pub code: InvitationCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationResponse {
    pub vault_id: VaultId,
    pub membership: Membership,
    /// The caller was already an active member; nothing new was created.
    pub already_member: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationRequest {
    pub caller: Caller,
    pub code: InvitationCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListInvitationsRequest {
    pub caller: Caller,
    pub vault_id: VaultId,
}

/// Invite, accept, revoke and list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvitationCommand: Send + Sync {
    async fn create_invitation(
        &self,
        request: CreateInvitationRequest,
    ) -> Result<CreateInvitationResponse, Error>;

    async fn accept_invitation(
        &self,
        request: AcceptInvitationRequest,
    ) -> Result<AcceptInvitationResponse, Error>;

    async fn revoke_invitation(&self, request: InvitationRequest) -> Result<Invitation, Error>;

    async fn list_invitations(&self, request: ListInvitationsRequest)
    -> Result<Vec<Invitation>, Error>;
}
