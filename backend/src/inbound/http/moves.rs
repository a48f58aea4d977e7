//! Cross-vault move HTTP handlers.
//!
//! ```text
//! POST /api/v1/vaults/{vault_id}/assets/{asset_id}/move {"targetVaultId":"v2","targetCollectionId":"c9"}
//! POST /api/v1/vaults/{vault_id}/collections/{collection_id}/move {"targetVaultId":"v2"}
//! GET /api/v1/vaults/{vault_id}/move-jobs/{job_id}
//! POST /api/v1/vaults/{vault_id}/move-jobs/{job_id}/resume
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::ports::{MoveAssetRequest, MoveCollectionRequest, MoveJobRequest};
use crate::domain::{CollectionId, Error, IdValidationError, JobId, MoveJob, MovePhase, VaultId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::rate_limit::RateClass;
use crate::inbound::http::resources::{AssetPath, CollectionPath};
use crate::inbound::http::response::{accepted, ok};
use crate::inbound::http::schemas::{AssetSchema, ErrorSchema, MoveJobSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_id};
use crate::inbound::http::vaults::VaultPath;

const TARGET_VAULT_ID: FieldName = FieldName::new("targetVaultId");
const TARGET_COLLECTION_ID: FieldName = FieldName::new("targetCollectionId");

#[derive(Debug, Deserialize)]
pub(crate) struct MoveJobPath {
    vault_id: String,
    job_id: String,
}

impl MoveJobPath {
    fn parse(self) -> Result<(VaultId, JobId), Error> {
        let vault_id = VaultPath::from_raw(self.vault_id).parse()?;
        Ok((vault_id, parse_id(self.job_id, FieldName::new("jobId"))?))
    }
}

/// Request payload for moving one asset.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveAssetBody {
    pub target_vault_id: Option<String>,
    pub target_collection_id: Option<String>,
}

/// Request payload for moving a collection with all of its assets.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveCollectionBody {
    pub target_vault_id: Option<String>,
}

fn required_id<T>(raw: Option<String>, field: FieldName) -> Result<T, Error>
where
    T: TryFrom<String, Error = IdValidationError>,
{
    parse_id(raw.ok_or_else(|| missing_field_error(field))?, field)
}

/// Move one asset into another collection, in the same vault or another one.
#[utoipa::path(
    post,
    path = "/api/v1/vaults/{vault_id}/assets/{asset_id}/move",
    params(
        ("vault_id" = String, Path, description = "Source vault"),
        ("asset_id" = String, Path, description = "Asset to move")
    ),
    request_body = MoveAssetBody,
    responses(
        (status = 200, description = "Asset moved", body = AssetSchema),
        (status = 400, description = "Missing or malformed target ids", body = ErrorSchema),
        (status = 403, description = "Delete in source or create in target denied", body = ErrorSchema),
        (status = 404, description = "Asset or target collection not found", body = ErrorSchema)
    ),
    tags = ["moves"],
    operation_id = "moveAsset",
    security(("BearerToken" = []))
)]
#[post("/vaults/{vault_id}/assets/{asset_id}/move")]
pub async fn move_asset(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<AssetPath>,
    payload: web::Json<MoveAssetBody>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Destructive)?;
    let (source_vault_id, asset_id) = path.into_inner().parse()?;
    let MoveAssetBody {
        target_vault_id,
        target_collection_id,
    } = payload.into_inner();
    let target_vault_id: VaultId = required_id(target_vault_id, TARGET_VAULT_ID)?;
    let target_collection_id: CollectionId =
        required_id(target_collection_id, TARGET_COLLECTION_ID)?;
    let moved = state
        .moves
        .move_asset(MoveAssetRequest {
            caller: auth.into_caller(),
            source_vault_id,
            asset_id,
            target_vault_id,
            target_collection_id,
        })
        .await?;
    ok(&moved)
}

/// Move a collection and its assets into another vault.
///
/// Responds 200 when the move finished and 202 when it stopped part way; the
/// job can then be resumed.
#[utoipa::path(
    post,
    path = "/api/v1/vaults/{vault_id}/collections/{collection_id}/move",
    params(
        ("vault_id" = String, Path, description = "Source vault"),
        ("collection_id" = String, Path, description = "Collection to move")
    ),
    request_body = MoveCollectionBody,
    responses(
        (status = 200, description = "Move completed", body = MoveJobSchema),
        (status = 202, description = "Move interrupted and resumable", body = MoveJobSchema),
        (status = 400, description = "Source and target are the same vault", body = ErrorSchema),
        (status = 403, description = "Delete in source or create in target denied", body = ErrorSchema),
        (status = 404, description = "Collection not found", body = ErrorSchema)
    ),
    tags = ["moves"],
    operation_id = "moveCollection",
    security(("BearerToken" = []))
)]
#[post("/vaults/{vault_id}/collections/{collection_id}/move")]
pub async fn move_collection(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<CollectionPath>,
    payload: web::Json<MoveCollectionBody>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Destructive)?;
    let (source_vault_id, collection_id) = path.into_inner().parse()?;
    let target_vault_id: VaultId =
        required_id(payload.into_inner().target_vault_id, TARGET_VAULT_ID)?;
    let job = state
        .moves
        .move_collection(MoveCollectionRequest {
            caller: auth.into_caller(),
            source_vault_id,
            collection_id,
            target_vault_id,
        })
        .await?;
    job_response(&job)
}

/// Report the progress of a collection move.
#[utoipa::path(
    get,
    path = "/api/v1/vaults/{vault_id}/move-jobs/{job_id}",
    params(
        ("vault_id" = String, Path, description = "Source vault"),
        ("job_id" = String, Path, description = "Move job identifier")
    ),
    responses(
        (status = 200, description = "Move job", body = MoveJobSchema),
        (status = 404, description = "Job not found", body = ErrorSchema)
    ),
    tags = ["moves"],
    operation_id = "getMoveJob",
    security(("BearerToken" = []))
)]
#[get("/vaults/{vault_id}/move-jobs/{job_id}")]
pub async fn get_move_job(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<MoveJobPath>,
) -> ApiResult<HttpResponse> {
    let (vault_id, job_id) = path.into_inner().parse()?;
    let job = state
        .moves
        .move_job(MoveJobRequest {
            caller: auth.into_caller(),
            vault_id,
            job_id,
        })
        .await?;
    ok(&json!({ "job": job }))
}

/// Resume a failed or interrupted collection move.
#[utoipa::path(
    post,
    path = "/api/v1/vaults/{vault_id}/move-jobs/{job_id}/resume",
    params(
        ("vault_id" = String, Path, description = "Source vault"),
        ("job_id" = String, Path, description = "Move job identifier")
    ),
    responses(
        (status = 200, description = "Move completed", body = MoveJobSchema),
        (status = 202, description = "Move interrupted again", body = MoveJobSchema),
        (status = 404, description = "Job not found", body = ErrorSchema)
    ),
    tags = ["moves"],
    operation_id = "resumeMoveJob",
    security(("BearerToken" = []))
)]
#[post("/vaults/{vault_id}/move-jobs/{job_id}/resume")]
pub async fn resume_move_job(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<MoveJobPath>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Destructive)?;
    let (vault_id, job_id) = path.into_inner().parse()?;
    let job = state
        .moves
        .resume_move(MoveJobRequest {
            caller: auth.into_caller(),
            vault_id,
            job_id,
        })
        .await?;
    job_response(&job)
}

fn job_response(job: &MoveJob) -> ApiResult<HttpResponse> {
    let body = json!({ "job": job });
    if job.phase == MovePhase::Completed {
        ok(&body)
    } else {
        accepted(&body)
    }
}

#[cfg(test)]
#[path = "moves_tests.rs"]
mod tests;
