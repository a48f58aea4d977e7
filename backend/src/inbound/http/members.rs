//! Membership and scoped-grant HTTP handlers.
//!
//! ```text
//! GET /api/v1/vaults/{vault_id}/members
//! DELETE /api/v1/vaults/{vault_id}/members/{user_id}
//! PUT /api/v1/vaults/{vault_id}/members/{user_id}/permissions {"view":true,"create":true}
//! PUT /api/v1/vaults/{vault_id}/grants/{scope}/{scope_id}/{user_id} {"view":true}
//! DELETE /api/v1/vaults/{vault_id}/grants/{scope}/{scope_id}/{user_id}
//! ```

use actix_web::{HttpResponse, delete, get, put, web};
use serde::Deserialize;
use serde_json::json;

use crate::domain::ports::{GrantRequest, MemberRequest, UpdatePermissionsRequest, UpsertGrantRequest};
use crate::domain::{
    AssetId, Caller, CollectionId, Error, GrantScope, PermissionFlags, UserId, VaultId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::rate_limit::RateClass;
use crate::inbound::http::response::ok;
use crate::inbound::http::schemas::{
    ErrorSchema, MembershipSchema, PermissionFlagsSchema, PermissionGrantSchema,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_value_error, parse_id};
use crate::inbound::http::vaults::VaultPath;

const USER_ID: FieldName = FieldName::new("userId");
const SCOPE_ID: FieldName = FieldName::new("scopeId");

#[derive(Debug, Deserialize)]
pub(crate) struct MemberPath {
    vault_id: String,
    user_id: String,
}

impl MemberPath {
    fn parse(self) -> Result<(VaultId, UserId), Error> {
        let vault_id = VaultPath::from_raw(self.vault_id).parse()?;
        Ok((vault_id, parse_id(self.user_id, USER_ID)?))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GrantPath {
    vault_id: String,
    scope: String,
    scope_id: String,
    user_id: String,
}

impl GrantPath {
    fn into_request(self, caller: Caller) -> Result<GrantRequest, Error> {
        let vault_id = VaultPath::from_raw(self.vault_id).parse()?;
        let scope: GrantScope = self
            .scope
            .parse()
            .map_err(|message: String| invalid_value_error(FieldName::new("scope"), message))?;
        let scope_id = match scope {
            GrantScope::Collection => String::from(parse_id::<CollectionId>(self.scope_id, SCOPE_ID)?),
            GrantScope::Asset => String::from(parse_id::<AssetId>(self.scope_id, SCOPE_ID)?),
        };
        Ok(GrantRequest {
            caller,
            vault_id,
            user_id: parse_id(self.user_id, USER_ID)?,
            scope,
            scope_id,
        })
    }
}

/// List the vault's members, including revoked ones.
#[utoipa::path(
    get,
    path = "/api/v1/vaults/{vault_id}/members",
    params(("vault_id" = String, Path, description = "Vault identifier")),
    responses(
        (status = 200, description = "Members", body = [MembershipSchema]),
        (status = 403, description = "Not a member", body = ErrorSchema)
    ),
    tags = ["members"],
    operation_id = "listMembers",
    security(("BearerToken" = []))
)]
#[get("/vaults/{vault_id}/members")]
pub async fn list_members(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
) -> ApiResult<HttpResponse> {
    let vault_id = path.into_inner().parse()?;
    let members = state
        .members
        .list_members(auth.into_caller(), vault_id)
        .await?;
    ok(&json!({ "members": members }))
}

/// Revoke a delegate, or leave the vault when targeting yourself.
#[utoipa::path(
    delete,
    path = "/api/v1/vaults/{vault_id}/members/{user_id}",
    params(
        ("vault_id" = String, Path, description = "Vault identifier"),
        ("user_id" = String, Path, description = "Member to remove")
    ),
    responses(
        (status = 200, description = "Membership revoked", body = MembershipSchema),
        (status = 403, description = "Owner only, or the owner cannot leave", body = ErrorSchema),
        (status = 404, description = "Member not found", body = ErrorSchema)
    ),
    tags = ["members"],
    operation_id = "removeMember",
    security(("BearerToken" = []))
)]
#[delete("/vaults/{vault_id}/members/{user_id}")]
pub async fn remove_member(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<MemberPath>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Destructive)?;
    let (vault_id, user_id) = path.into_inner().parse()?;
    let membership = state
        .members
        .remove_member(MemberRequest {
            caller: auth.into_caller(),
            vault_id,
            user_id,
        })
        .await?;
    ok(&json!({ "membership": membership }))
}

/// Replace a delegate's vault-level permission flags. Owner only.
#[utoipa::path(
    put,
    path = "/api/v1/vaults/{vault_id}/members/{user_id}/permissions",
    params(
        ("vault_id" = String, Path, description = "Vault identifier"),
        ("user_id" = String, Path, description = "Delegate to update")
    ),
    request_body = PermissionFlagsSchema,
    responses(
        (status = 200, description = "Membership updated", body = MembershipSchema),
        (status = 403, description = "Owner only", body = ErrorSchema),
        (status = 404, description = "Member not found", body = ErrorSchema)
    ),
    tags = ["members"],
    operation_id = "updateMemberPermissions",
    security(("BearerToken" = []))
)]
#[put("/vaults/{vault_id}/members/{user_id}/permissions")]
pub async fn update_permissions(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<MemberPath>,
    payload: web::Json<PermissionFlags>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Write)?;
    let (vault_id, user_id) = path.into_inner().parse()?;
    let membership = state
        .members
        .update_permissions(UpdatePermissionsRequest {
            caller: auth.into_caller(),
            vault_id,
            user_id,
            permissions: payload.into_inner(),
        })
        .await?;
    ok(&json!({ "membership": membership }))
}

/// Set a collection- or asset-scoped override for one member. Owner only.
#[utoipa::path(
    put,
    path = "/api/v1/vaults/{vault_id}/grants/{scope}/{scope_id}/{user_id}",
    params(
        ("vault_id" = String, Path, description = "Vault identifier"),
        ("scope" = String, Path, description = "`collection` or `asset`"),
        ("scope_id" = String, Path, description = "Collection or asset identifier"),
        ("user_id" = String, Path, description = "Member receiving the grant")
    ),
    request_body = PermissionFlagsSchema,
    responses(
        (status = 200, description = "Grant stored", body = PermissionGrantSchema),
        (status = 400, description = "Unknown scope", body = ErrorSchema),
        (status = 403, description = "Owner only", body = ErrorSchema),
        (status = 404, description = "Member or resource not found", body = ErrorSchema)
    ),
    tags = ["members"],
    operation_id = "upsertGrant",
    security(("BearerToken" = []))
)]
#[put("/vaults/{vault_id}/grants/{scope}/{scope_id}/{user_id}")]
pub async fn upsert_grant(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<GrantPath>,
    payload: web::Json<PermissionFlags>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Write)?;
    let grant = path.into_inner().into_request(auth.caller().clone())?;
    let stored = state
        .members
        .upsert_grant(UpsertGrantRequest {
            grant,
            permissions: payload.into_inner(),
        })
        .await?;
    ok(&json!({ "grant": stored }))
}

/// Remove a scoped override. Removing an absent grant succeeds.
#[utoipa::path(
    delete,
    path = "/api/v1/vaults/{vault_id}/grants/{scope}/{scope_id}/{user_id}",
    params(
        ("vault_id" = String, Path, description = "Vault identifier"),
        ("scope" = String, Path, description = "`collection` or `asset`"),
        ("scope_id" = String, Path, description = "Collection or asset identifier"),
        ("user_id" = String, Path, description = "Member holding the grant")
    ),
    responses(
        (status = 200, description = "Grant removed, or already absent"),
        (status = 403, description = "Owner only", body = ErrorSchema)
    ),
    tags = ["members"],
    operation_id = "deleteGrant",
    security(("BearerToken" = []))
)]
#[delete("/vaults/{vault_id}/grants/{scope}/{scope_id}/{user_id}")]
pub async fn delete_grant(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<GrantPath>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Write)?;
    let grant = path.into_inner().into_request(auth.caller().clone())?;
    let existed = state.members.delete_grant(grant).await?;
    ok(&json!({ "deleted": existed }))
}

#[cfg(test)]
#[path = "members_tests.rs"]
mod tests;
