//! Collection and asset HTTP handlers.
//!
//! ```text
//! GET /api/v1/vaults/{vault_id}/collections?cursor=..&limit=50
//! POST /api/v1/vaults/{vault_id}/collections {"name":"Trips","description":"2026"}
//! DELETE /api/v1/vaults/{vault_id}/collections/{collection_id}
//! GET /api/v1/vaults/{vault_id}/assets?collectionId=c1&cursor=..&limit=50
//! POST /api/v1/vaults/{vault_id}/assets {"collectionId":"c1","title":"Beach"}
//! GET /api/v1/vaults/{vault_id}/assets/{asset_id}
//! DELETE /api/v1/vaults/{vault_id}/assets/{asset_id}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    CreateAssetRequest, CreateCollectionRequest, DeleteAssetRequest, DeleteCollectionRequest,
    GetAssetRequest, ListAssetsRequest, ListCollectionsRequest,
};
use crate::domain::{AssetId, CollectionId, Error, VaultId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::rate_limit::RateClass;
use crate::inbound::http::response::{created, ok};
use crate::inbound::http::schemas::{AssetSchema, CollectionSchema, ErrorSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, page_limit, parse_id};
use crate::inbound::http::vaults::VaultPath;

const COLLECTION_ID: FieldName = FieldName::new("collectionId");
const ASSET_ID: FieldName = FieldName::new("assetId");

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionPath {
    vault_id: String,
    collection_id: String,
}

impl CollectionPath {
    pub(crate) fn parse(self) -> Result<(VaultId, CollectionId), Error> {
        let vault_id = VaultPath::from_raw(self.vault_id).parse()?;
        Ok((vault_id, parse_id(self.collection_id, COLLECTION_ID)?))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssetPath {
    vault_id: String,
    asset_id: String,
}

impl AssetPath {
    pub(crate) fn parse(self) -> Result<(VaultId, AssetId), Error> {
        let vault_id = VaultPath::from_raw(self.vault_id).parse()?;
        Ok((vault_id, parse_id(self.asset_id, ASSET_ID)?))
    }
}

/// Paging parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Opaque cursor from a previous page's `nextCursor`.
    pub cursor: Option<String>,
    /// Page size, 1 to 200. Defaults to 50.
    pub limit: Option<usize>,
    /// Restrict asset listings to one collection.
    pub collection_id: Option<String>,
}

/// Request payload for creating a collection.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionBody {
    #[schema(example = "Trips")]
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Request payload for creating an asset.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetBody {
    pub collection_id: Option<String>,
    #[schema(example = "Beach at dusk")]
    pub title: Option<String>,
    pub body: Option<String>,
    #[schema(example = "https://media.example.com/beach.jpg")]
    pub media_url: Option<String>,
}

/// List collections in a vault.
#[utoipa::path(
    get,
    path = "/api/v1/vaults/{vault_id}/collections",
    params(("vault_id" = String, Path, description = "Vault identifier"), PageQuery),
    responses(
        (status = 200, description = "A page of collections", body = [CollectionSchema]),
        (status = 403, description = "View permission required", body = ErrorSchema)
    ),
    tags = ["resources"],
    operation_id = "listCollections",
    security(("BearerToken" = []))
)]
#[get("/vaults/{vault_id}/collections")]
pub async fn list_collections(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let vault_id = path.into_inner().parse()?;
    let query = query.into_inner();
    let page = state
        .resources_query
        .list_collections(ListCollectionsRequest {
            caller: auth.into_caller(),
            vault_id,
            cursor: query.cursor,
            limit: page_limit(query.limit)?,
        })
        .await?;
    ok(&json!({ "collections": page.items, "nextCursor": page.next_cursor }))
}

/// Create a collection.
#[utoipa::path(
    post,
    path = "/api/v1/vaults/{vault_id}/collections",
    params(("vault_id" = String, Path, description = "Vault identifier")),
    request_body = CreateCollectionBody,
    responses(
        (status = 201, description = "Collection created", body = CollectionSchema),
        (status = 403, description = "Create permission required or capacity reached", body = ErrorSchema),
        (status = 429, description = "Daily write quota exhausted", body = ErrorSchema)
    ),
    tags = ["resources"],
    operation_id = "createCollection",
    security(("BearerToken" = []))
)]
#[post("/vaults/{vault_id}/collections")]
pub async fn create_collection(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
    payload: web::Json<CreateCollectionBody>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Write)?;
    let vault_id = path.into_inner().parse()?;
    let CreateCollectionBody { name, description } = payload.into_inner();
    let name = name.ok_or_else(|| missing_field_error(FieldName::new("name")))?;
    let collection = state
        .resources
        .create_collection(CreateCollectionRequest {
            caller: auth.into_caller(),
            vault_id,
            name,
            description,
        })
        .await?;
    created(&json!({ "collection": collection }))
}

/// Delete a collection and every asset in it.
#[utoipa::path(
    delete,
    path = "/api/v1/vaults/{vault_id}/collections/{collection_id}",
    params(
        ("vault_id" = String, Path, description = "Vault identifier"),
        ("collection_id" = String, Path, description = "Collection identifier")
    ),
    responses(
        (status = 200, description = "Collection deleted, or already absent"),
        (status = 403, description = "Delete permission required", body = ErrorSchema),
        (status = 429, description = "Daily destructive quota exhausted", body = ErrorSchema)
    ),
    tags = ["resources"],
    operation_id = "deleteCollection",
    security(("BearerToken" = []))
)]
#[delete("/vaults/{vault_id}/collections/{collection_id}")]
pub async fn delete_collection(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<CollectionPath>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Destructive)?;
    let (vault_id, collection_id) = path.into_inner().parse()?;
    let deleted = state
        .resources
        .delete_collection(DeleteCollectionRequest {
            caller: auth.into_caller(),
            vault_id,
            collection_id,
        })
        .await?;
    ok(&deleted)
}

/// List assets in a vault, optionally within one collection.
#[utoipa::path(
    get,
    path = "/api/v1/vaults/{vault_id}/assets",
    params(("vault_id" = String, Path, description = "Vault identifier"), PageQuery),
    responses(
        (status = 200, description = "A page of assets", body = [AssetSchema]),
        (status = 403, description = "View permission required", body = ErrorSchema)
    ),
    tags = ["resources"],
    operation_id = "listAssets",
    security(("BearerToken" = []))
)]
#[get("/vaults/{vault_id}/assets")]
pub async fn list_assets(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let vault_id = path.into_inner().parse()?;
    let query = query.into_inner();
    let collection_id = query
        .collection_id
        .map(|raw| parse_id(raw, COLLECTION_ID))
        .transpose()?;
    let page = state
        .resources_query
        .list_assets(ListAssetsRequest {
            caller: auth.into_caller(),
            vault_id,
            collection_id,
            cursor: query.cursor,
            limit: page_limit(query.limit)?,
        })
        .await?;
    ok(&json!({ "assets": page.items, "nextCursor": page.next_cursor }))
}

/// Create an asset inside a collection.
#[utoipa::path(
    post,
    path = "/api/v1/vaults/{vault_id}/assets",
    params(("vault_id" = String, Path, description = "Vault identifier")),
    request_body = CreateAssetBody,
    responses(
        (status = 201, description = "Asset created", body = AssetSchema),
        (status = 403, description = "Create permission required or capacity reached", body = ErrorSchema),
        (status = 404, description = "Collection not found", body = ErrorSchema),
        (status = 429, description = "Daily write quota exhausted", body = ErrorSchema)
    ),
    tags = ["resources"],
    operation_id = "createAsset",
    security(("BearerToken" = []))
)]
#[post("/vaults/{vault_id}/assets")]
pub async fn create_asset(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<VaultPath>,
    payload: web::Json<CreateAssetBody>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Write)?;
    let vault_id = path.into_inner().parse()?;
    let CreateAssetBody {
        collection_id,
        title,
        body,
        media_url,
    } = payload.into_inner();
    let collection_id = parse_id(
        collection_id.ok_or_else(|| missing_field_error(COLLECTION_ID))?,
        COLLECTION_ID,
    )?;
    let title = title.ok_or_else(|| missing_field_error(FieldName::new("title")))?;
    let asset = state
        .resources
        .create_asset(CreateAssetRequest {
            caller: auth.into_caller(),
            vault_id,
            collection_id,
            title,
            body,
            media_url,
        })
        .await?;
    created(&json!({ "asset": asset }))
}

/// Fetch one asset.
#[utoipa::path(
    get,
    path = "/api/v1/vaults/{vault_id}/assets/{asset_id}",
    params(
        ("vault_id" = String, Path, description = "Vault identifier"),
        ("asset_id" = String, Path, description = "Asset identifier")
    ),
    responses(
        (status = 200, description = "The asset", body = AssetSchema),
        (status = 403, description = "View permission required", body = ErrorSchema),
        (status = 404, description = "Asset not found", body = ErrorSchema)
    ),
    tags = ["resources"],
    operation_id = "getAsset",
    security(("BearerToken" = []))
)]
#[get("/vaults/{vault_id}/assets/{asset_id}")]
pub async fn get_asset(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<AssetPath>,
) -> ApiResult<HttpResponse> {
    let (vault_id, asset_id) = path.into_inner().parse()?;
    let asset = state
        .resources_query
        .get_asset(GetAssetRequest {
            caller: auth.into_caller(),
            vault_id,
            asset_id,
        })
        .await?;
    ok(&json!({ "asset": asset }))
}

/// Delete an asset. Deleting an absent asset succeeds without side effects.
#[utoipa::path(
    delete,
    path = "/api/v1/vaults/{vault_id}/assets/{asset_id}",
    params(
        ("vault_id" = String, Path, description = "Vault identifier"),
        ("asset_id" = String, Path, description = "Asset identifier")
    ),
    responses(
        (status = 200, description = "Asset deleted, or already absent"),
        (status = 403, description = "Delete permission required", body = ErrorSchema),
        (status = 429, description = "Daily destructive quota exhausted", body = ErrorSchema)
    ),
    tags = ["resources"],
    operation_id = "deleteAsset",
    security(("BearerToken" = []))
)]
#[delete("/vaults/{vault_id}/assets/{asset_id}")]
pub async fn delete_asset(
    state: web::Data<HttpState>,
    auth: Authenticated,
    path: web::Path<AssetPath>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Destructive)?;
    let (vault_id, asset_id) = path.into_inner().parse()?;
    let deleted = state
        .resources
        .delete_asset(DeleteAssetRequest {
            caller: auth.into_caller(),
            vault_id,
            asset_id,
        })
        .await?;
    ok(&deleted)
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;
