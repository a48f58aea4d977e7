//! Invitation lifecycle HTTP handlers.
//!
//! ```text
//! POST /api/v1/vaults/{vault_id}/invitations {"email":"bob@example.com","permissions":{"view":true}}
//! GET /api/v1/vaults/{vault_id}/invitations
//! POST /api/v1/invitations/accept {"code":"v1.Zk3mQ8rT2vX9bN4cL7pW1sYd"}
//! POST /api/v1/invitations/{code}/revoke
//! ```
//!
//! Accepting is idempotent for the same user: a second accept reports
//! `alreadyMember` instead of failing.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::ports::{
    AcceptInvitationRequest, CreateInvitationRequest, InvitationRequest, ListInvitationsRequest,
};
use crate::domain::{InvitationCode, PermissionFlags};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::rate_limit::RateClass;
use crate::inbound::http::response::{created, ok};
use crate::inbound::http::schemas::{ErrorSchema, InvitationSchema, PermissionFlagsSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_id};
use crate::inbound::http::vaults::VaultPath;

const CODE: FieldName = FieldName::new("code");

/// Request payload for inviting a delegate.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationBody {
    #[schema(example = "bob@example.com")]
    pub email: Option<String>,
    /// Baseline flags for the new delegate. View-only when omitted.
    #[schema(value_type = Option<PermissionFlagsSchema>)]
    pub permissions: Option<PermissionFlags>,
}

/// Request payload for accepting an invitation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationBody {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvitationPath {
    code: String,
}

/// Invite someone to the vault by email. Owner only.
#[utoipa::path(
    post,
    path = "/api/v1/vaults/{vault_id}/invitations",
    params(("vault_id" = String, Path, description = "Vault identifier")),
    request_body = CreateInvitationBody,
    responses(
        (status = 201, description = "Invitation created", body = InvitationSchema),
        (status = 400, description = "Invalid email", body = ErrorSchema),
        (status = 402, description = "Delegates require a paid tier", body = ErrorSchema),
        (status = 403, description = "Owner only, or delegate capacity reached", body = ErrorSchema),
        (status = 409, description = "Already a member or invited", body = ErrorSchema),
        (status = 429, description = "Daily invite quota exhausted", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "createInvitation",
    security(("BearerToken" = []))
)]
#[post("/vaults/{vault_id}/invitations")]
pub async fn create_invitation(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
    payload: web::Json<CreateInvitationBody>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Invitation)?;
    let vault_id = path.into_inner().parse()?;
    let CreateInvitationBody { email, permissions } = payload.into_inner();
    let email = email.ok_or_else(|| missing_field_error(FieldName::new("email")))?;
    let response = state
        .invitations
        .create_invitation(CreateInvitationRequest {
            caller: auth.into_caller(),
            vault_id,
            email,
            permissions,
        })
        .await?;
    created(&response)
}

/// List a vault's invitations. Owner only.
#[utoipa::path(
    get,
    path = "/api/v1/vaults/{vault_id}/invitations",
    params(("vault_id" = String, Path, description = "Vault identifier")),
    responses(
        (status = 200, description = "Invitations, newest first", body = [InvitationSchema]),
        (status = 403, description = "Owner only", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "listInvitations",
    security(("BearerToken" = []))
)]
#[get("/vaults/{vault_id}/invitations")]
pub async fn list_invitations(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
) -> ApiResult<HttpResponse> {
    let vault_id = path.into_inner().parse()?;
    let invitations = state
        .invitations
        .list_invitations(ListInvitationsRequest {
            caller: auth.into_caller(),
            vault_id,
        })
        .await?;
    ok(&json!({ "invitations": invitations }))
}

/// Accept an invitation as the signed-in user.
#[utoipa::path(
    post,
    path = "/api/v1/invitations/accept",
    request_body = AcceptInvitationBody,
    responses(
        (status = 200, description = "Membership active"),
        (status = 403, description = "Invitation addressed to another email", body = ErrorSchema),
        (status = 404, description = "Invitation not found", body = ErrorSchema),
        (status = 409, description = "Invitation revoked or used", body = ErrorSchema),
        (status = 410, description = "Invitation expired", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "acceptInvitation",
    security(("BearerToken" = []))
)]
#[post("/invitations/accept")]
pub async fn accept_invitation(
    state: web::Data<HttpState>,
    auth: Authenticated,
    payload: web::Json<AcceptInvitationBody>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Invitation)?;
    let raw = payload
        .into_inner()
        .code
        .ok_or_else(|| missing_field_error(CODE))?;
    let code: InvitationCode = parse_id(raw, CODE)?;
    let accepted = state
        .invitations
        .accept_invitation(AcceptInvitationRequest {
            caller: auth.into_caller(),
            code,
        })
        .await?;
    ok(&accepted)
}

/// Revoke a pending invitation. Owner only.
#[utoipa::path(
    post,
    path = "/api/v1/invitations/{code}/revoke",
    params(("code" = String, Path, description = "Invitation code")),
    responses(
        (status = 200, description = "Invitation revoked", body = InvitationSchema),
        (status = 403, description = "Owner only", body = ErrorSchema),
        (status = 404, description = "Invitation not found", body = ErrorSchema),
        (status = 409, description = "Invitation no longer pending", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "revokeInvitation",
    security(("BearerToken" = []))
)]
#[post("/invitations/{code}/revoke")]
pub async fn revoke_invitation(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<InvitationPath>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Invitation)?;
    let code: InvitationCode = parse_id(path.into_inner().code, CODE)?;
    let invitation = state
        .invitations
        .revoke_invitation(InvitationRequest {
            caller: auth.into_caller(),
            code,
        })
        .await?;
    ok(&json!({ "invitation": invitation }))
}

#[cfg(test)]
#[path = "invitations_tests.rs"]
mod tests;
