//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers:
//!
//! - **Paths**: every handler under `/api/v1` plus the health probes
//! - **Schemas**: wrappers in [`crate::inbound::http::schemas`] that describe
//!   domain types without coupling them to utoipa, and the request bodies
//! - **Security**: bearer token authentication
//!
//! The generated specification is served at `/api-docs/openapi.json` with
//! Swagger UI in debug builds, and exported via `cargo run --bin openapi-dump`.

use crate::inbound::http::billing::SubmitReceiptBody;
use crate::inbound::http::invitations::{AcceptInvitationBody, CreateInvitationBody};
use crate::inbound::http::moves::{MoveAssetBody, MoveCollectionBody};
use crate::inbound::http::resources::{CreateAssetBody, CreateCollectionBody};
use crate::inbound::http::schemas::{
    AssetSchema, CollectionSchema, DeletionJobSchema, ErrorCodeSchema, ErrorSchema,
    InvitationSchema, MembershipSchema, MoveJobSchema, MovedFromSchema, PermissionFlagsSchema,
    PermissionGrantSchema, SubscriptionSchema, VaultListingSchema, VaultSchema,
};
use crate::inbound::http::vaults::{CreateVaultBody, TransferOwnershipBody};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "BearerToken",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Identity provider token for the calling user."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Shared vaults API",
        description = "Multi-tenant vaults with delegated access, tiered quotas and audited mutations."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = [])),
    paths(
        crate::inbound::http::vaults::create_vault,
        crate::inbound::http::vaults::list_vaults,
        crate::inbound::http::vaults::describe_vault,
        crate::inbound::http::vaults::delete_vault,
        crate::inbound::http::vaults::transfer_ownership,
        crate::inbound::http::resources::list_collections,
        crate::inbound::http::resources::create_collection,
        crate::inbound::http::resources::delete_collection,
        crate::inbound::http::resources::list_assets,
        crate::inbound::http::resources::create_asset,
        crate::inbound::http::resources::get_asset,
        crate::inbound::http::resources::delete_asset,
        crate::inbound::http::moves::move_asset,
        crate::inbound::http::moves::move_collection,
        crate::inbound::http::moves::get_move_job,
        crate::inbound::http::moves::resume_move_job,
        crate::inbound::http::invitations::create_invitation,
        crate::inbound::http::invitations::list_invitations,
        crate::inbound::http::invitations::accept_invitation,
        crate::inbound::http::invitations::revoke_invitation,
        crate::inbound::http::members::list_members,
        crate::inbound::http::members::remove_member,
        crate::inbound::http::members::update_permissions,
        crate::inbound::http::members::upsert_grant,
        crate::inbound::http::members::delete_grant,
        crate::inbound::http::account::request_deletion,
        crate::inbound::http::account::deletion_job,
        crate::inbound::http::billing::submit_receipt,
        crate::inbound::http::billing::subscription,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        PermissionFlagsSchema,
        VaultSchema,
        MembershipSchema,
        VaultListingSchema,
        PermissionGrantSchema,
        MovedFromSchema,
        CollectionSchema,
        AssetSchema,
        InvitationSchema,
        MoveJobSchema,
        DeletionJobSchema,
        SubscriptionSchema,
        CreateVaultBody,
        TransferOwnershipBody,
        CreateCollectionBody,
        CreateAssetBody,
        MoveAssetBody,
        MoveCollectionBody,
        CreateInvitationBody,
        AcceptInvitationBody,
        SubmitReceiptBody,
    )),
    tags(
        (name = "vaults", description = "Vault lifecycle and ownership"),
        (name = "resources", description = "Collections and assets inside a vault"),
        (name = "moves", description = "Cross-vault moves and resumable move jobs"),
        (name = "invitations", description = "Delegate invitations"),
        (name = "members", description = "Memberships and scoped permission grants"),
        (name = "account", description = "Account deletion"),
        (name = "billing", description = "Subscription receipts"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated document's structure.

    use super::*;
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // Note: utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";
    const ASSET_SCHEMA_NAME: &str = "crate.domain.Asset";

    /// Assert that an Object schema contains a field with the given name.
    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn openapi_error_schema_has_envelope_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "error");
        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "traceId");
    }

    #[test]
    fn openapi_asset_schema_carries_move_provenance() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let asset_schema = schemas.get(ASSET_SCHEMA_NAME).expect("Asset schema");

        assert_object_schema_has_field(asset_schema, "collectionId");
        assert_object_schema_has_field(asset_schema, "movedFrom");
    }

    #[rstest]
    #[case("/api/v1/vaults")]
    #[case("/api/v1/vaults/{vault_id}/assets/{asset_id}/move")]
    #[case("/api/v1/invitations/accept")]
    #[case("/api/v1/account/delete")]
    #[case("/health/ready")]
    fn openapi_registers_paths(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    fn bad_request_description(doc: &utoipa::openapi::OpenApi, path: &str) -> String {
        let operation = doc
            .paths
            .paths
            .get(path)
            .and_then(|item| item.post.as_ref())
            .expect("post operation");
        match operation.responses.responses.get("400") {
            Some(RefOr::T(response)) => response.description.clone(),
            _ => panic!("expected an inline 400 response for {path}"),
        }
    }

    #[test]
    fn only_collection_moves_reject_same_vault_targets() {
        let doc = ApiDoc::openapi();
        let asset = bad_request_description(&doc, "/api/v1/vaults/{vault_id}/assets/{asset_id}/move");
        let collection = bad_request_description(
            &doc,
            "/api/v1/vaults/{vault_id}/collections/{collection_id}/move",
        );

        assert!(!asset.contains("same vault"));
        assert!(collection.contains("same vault"));
    }

    #[test]
    fn openapi_declares_bearer_security() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(
            matches!(
                components.security_schemes.get("BearerToken"),
                Some(SecurityScheme::Http(_))
            ),
            "bearer scheme registered"
        );
    }
}
