//! Account deletion HTTP handlers.
//!
//! ```text
//! POST /api/v1/account/delete
//! GET /api/v1/account/deletion-jobs/{job_id}
//! ```
//!
//! Deletion runs in the background; the request returns `202` with the job.

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use serde_json::json;

use crate::domain::JobId;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::rate_limit::RateClass;
use crate::inbound::http::response::{accepted, ok};
use crate::inbound::http::schemas::{DeletionJobSchema, ErrorSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

#[derive(Debug, Deserialize)]
pub(crate) struct DeletionJobPath {
    job_id: String,
}

/// Queue deletion of the caller's account and every vault they own.
#[utoipa::path(
    post,
    path = "/api/v1/account/delete",
    responses(
        (status = 202, description = "Deletion queued", body = DeletionJobSchema),
        (status = 401, description = "Unauthenticated", body = ErrorSchema),
        (status = 429, description = "Rate limited", body = ErrorSchema),
        (status = 503, description = "Deletion queue unavailable", body = ErrorSchema)
    ),
    tags = ["account"],
    operation_id = "requestAccountDeletion",
    security(("BearerToken" = []))
)]
#[post("/account/delete")]
pub async fn request_deletion(
    state: web::Data<HttpState>,
    auth: Authenticated,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::AccountDelete)?;
    let job = state.account.request_deletion(auth.into_caller()).await?;
    accepted(&json!({ "job": job }))
}

/// Report on one of the caller's deletion jobs.
#[utoipa::path(
    get,
    path = "/api/v1/account/deletion-jobs/{job_id}",
    params(("job_id" = String, Path, description = "Deletion job identifier")),
    responses(
        (status = 200, description = "Deletion job", body = DeletionJobSchema),
        (status = 404, description = "Job not found", body = ErrorSchema)
    ),
    tags = ["account"],
    operation_id = "getDeletionJob",
    security(("BearerToken" = []))
)]
#[get("/account/deletion-jobs/{job_id}")]
pub async fn deletion_job(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<DeletionJobPath>,
) -> ApiResult<HttpResponse> {
    let job_id: JobId = parse_id(path.into_inner().job_id, FieldName::new("jobId"))?;
    let job = state
        .account
        .deletion_job(auth.into_caller(), job_id)
        .await?;
    ok(&json!({ "job": job }))
}
