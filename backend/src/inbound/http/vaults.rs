//! Vault lifecycle HTTP handlers.
//!
//! ```text
//! POST /api/v1/vaults {"name":"Family photos"}
//! GET /api/v1/vaults
//! GET /api/v1/vaults/{vault_id}
//! POST /api/v1/vaults/{vault_id}/delete
//! POST /api/v1/vaults/{vault_id}/transfer-ownership {"newOwnerId":"u2"}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::ports::{CreateVaultRequest, TransferOwnershipRequest, VaultRequest};
use crate::domain::{Error, UserId, VaultId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::rate_limit::RateClass;
use crate::inbound::http::response::{created, ok};
use crate::inbound::http::schemas::{ErrorSchema, VaultListingSchema, VaultSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_id};

const VAULT_ID: FieldName = FieldName::new("vaultId");

#[derive(Debug, Deserialize)]
pub(crate) struct VaultPath {
    vault_id: String,
}

impl VaultPath {
    pub(crate) fn from_raw(vault_id: String) -> Self {
        Self { vault_id }
    }

    pub(crate) fn parse(self) -> Result<VaultId, Error> {
        parse_id(self.vault_id, VAULT_ID)
    }
}

/// Request payload for creating a vault.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVaultBody {
    #[schema(example = "Family photos")]
    pub name: Option<String>,
}

/// Request payload for handing a vault to another member.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferOwnershipBody {
    pub new_owner_id: Option<String>,
}

/// Create a vault owned by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/vaults",
    request_body = CreateVaultBody,
    responses(
        (status = 201, description = "Vault created", body = VaultSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthenticated", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema)
    ),
    tags = ["vaults"],
    operation_id = "createVault",
    security(("BearerToken" = []))
)]
#[post("/vaults")]
pub async fn create_vault(
    state: web::Data<HttpState>,
    auth: Authenticated,
    payload: web::Json<CreateVaultBody>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Write)?;
    let name = payload
        .into_inner()
        .name
        .ok_or_else(|| missing_field_error(FieldName::new("name")))?;
    let vault = state
        .vaults
        .create_vault(CreateVaultRequest {
            caller: auth.into_caller(),
            name,
        })
        .await?;
    created(&json!({ "vault": vault }))
}

/// List vaults the caller belongs to.
#[utoipa::path(
    get,
    path = "/api/v1/vaults",
    responses(
        (status = 200, description = "Vaults with the caller's membership", body = [VaultListingSchema]),
        (status = 401, description = "Unauthenticated", body = ErrorSchema)
    ),
    tags = ["vaults"],
    operation_id = "listVaults",
    security(("BearerToken" = []))
)]
#[get("/vaults")]
pub async fn list_vaults(
    state: web::Data<HttpState>,
    auth: Authenticated,
) -> ApiResult<HttpResponse> {
    let vaults = state.vaults_query.list_vaults(auth.into_caller()).await?;
    ok(&json!({ "vaults": vaults }))
}

/// Describe one vault with its plan, usage and limits.
#[utoipa::path(
    get,
    path = "/api/v1/vaults/{vault_id}",
    params(("vault_id" = String, Path, description = "Vault identifier")),
    responses(
        (status = 200, description = "Vault details"),
        (status = 403, description = "Not a member", body = ErrorSchema),
        (status = 404, description = "Vault not found", body = ErrorSchema)
    ),
    tags = ["vaults"],
    operation_id = "describeVault",
    security(("BearerToken" = []))
)]
#[get("/vaults/{vault_id}")]
pub async fn describe_vault(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
) -> ApiResult<HttpResponse> {
    let vault_id = path.into_inner().parse()?;
    let details = state
        .vaults_query
        .describe_vault(VaultRequest {
            caller: auth.into_caller(),
            vault_id,
        })
        .await?;
    ok(&details)
}

/// Permanently delete a vault and everything in it. Owner only.
#[utoipa::path(
    post,
    path = "/api/v1/vaults/{vault_id}/delete",
    params(("vault_id" = String, Path, description = "Vault identifier")),
    responses(
        (status = 200, description = "Vault deleted"),
        (status = 403, description = "Only the owner may delete the vault", body = ErrorSchema),
        (status = 404, description = "Vault not found", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema)
    ),
    tags = ["vaults"],
    operation_id = "deleteVault",
    security(("BearerToken" = []))
)]
#[post("/vaults/{vault_id}/delete")]
pub async fn delete_vault(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::VaultDelete)?;
    let vault_id = path.into_inner().parse()?;
    let deleted = state
        .vaults
        .delete_vault(VaultRequest {
            caller: auth.into_caller(),
            vault_id,
        })
        .await?;
    ok(&deleted)
}

/// Hand ownership to an active member of the vault.
#[utoipa::path(
    post,
    path = "/api/v1/vaults/{vault_id}/transfer-ownership",
    params(("vault_id" = String, Path, description = "Vault identifier")),
    request_body = TransferOwnershipBody,
    responses(
        (status = 200, description = "Ownership transferred", body = VaultSchema),
        (status = 403, description = "Only the owner may transfer", body = ErrorSchema),
        (status = 409, description = "New owner is not an active member", body = ErrorSchema)
    ),
    tags = ["vaults"],
    operation_id = "transferOwnership",
    security(("BearerToken" = []))
)]
#[post("/vaults/{vault_id}/transfer-ownership")]
pub async fn transfer_ownership(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
    payload: web::Json<TransferOwnershipBody>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Write)?;
    let vault_id = path.into_inner().parse()?;
    let new_owner_id: UserId = parse_id(
        payload
            .into_inner()
            .new_owner_id
            .ok_or_else(|| missing_field_error(FieldName::new("newOwnerId")))?,
        FieldName::new("newOwnerId"),
    )?;
    let vault = state
        .vaults
        .transfer_ownership(TransferOwnershipRequest {
            caller: auth.into_caller(),
            vault_id,
            new_owner_id,
        })
        .await?;
    ok(&json!({ "vault": vault }))
}

#[cfg(test)]
#[path = "vaults_tests.rs"]
mod tests;
