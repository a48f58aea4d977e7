//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration.
//!
//! The schema wrappers mirror the wire shape of their corresponding domain
//! types but live in the inbound adapter layer where framework concerns belong.

#![expect(
    dead_code,
    reason = "Schema wrappers exist only for OpenAPI generation via utoipa"
)]

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode, rename_all = "snake_case")]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// The feature requires a paid subscription.
    PaymentRequired,
    /// Not permitted, or a capacity cap was reached.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// The resource is in a state that does not allow the transition.
    Conflict,
    /// The resource existed but has expired.
    Gone,
    /// A daily quota or rate limit was exceeded.
    TooManyRequests,
    /// The document store or an upstream provider is unavailable.
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    InternalError,
}

/// OpenAPI schema for the error envelope.
///
/// Structured diagnostics such as `tier`, `limit`, `current`, `field` or
/// `retryAfterSeconds` are merged into the top level next to these fields.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
pub struct ErrorSchema {
    /// Human-readable message.
    #[schema(example = "Delete permission required")]
    error: String,
    /// Stable machine-readable error code.
    #[schema(example = "forbidden")]
    code: ErrorCodeSchema,
    /// Correlation identifier, also sent as the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
}

/// OpenAPI schema for [`crate::domain::PermissionFlags`].
#[derive(ToSchema)]
#[schema(as = crate::domain::PermissionFlags)]
pub struct PermissionFlagsSchema {
    view: bool,
    create: bool,
    delete: bool,
}

/// OpenAPI schema for [`crate::domain::Vault`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Vault, rename_all = "camelCase")]
pub struct VaultSchema {
    #[schema(example = "1b4e28ba-2fa1-11d2-883f-0016d3cca427")]
    id: String,
    owner_id: String,
    #[schema(example = "Family photos")]
    name: String,
    #[schema(format = DateTime)]
    created_at: String,
    #[schema(format = DateTime)]
    updated_at: String,
}

/// OpenAPI schema for [`crate::domain::Membership`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Membership, rename_all = "camelCase")]
pub struct MembershipSchema {
    user_id: String,
    /// `OWNER` or `DELEGATE`.
    #[schema(example = "DELEGATE")]
    role: String,
    /// `ACTIVE` or `REVOKED`.
    #[schema(example = "ACTIVE")]
    status: String,
    permissions: PermissionFlagsSchema,
    email: Option<String>,
    #[schema(format = DateTime)]
    joined_at: String,
    #[schema(format = DateTime)]
    updated_at: String,
}

/// OpenAPI schema for [`crate::domain::ports::VaultListing`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ports::VaultListing)]
pub struct VaultListingSchema {
    vault: VaultSchema,
    membership: MembershipSchema,
}

/// OpenAPI schema for [`crate::domain::PermissionGrant`].
#[derive(ToSchema)]
#[schema(as = crate::domain::PermissionGrant, rename_all = "camelCase")]
pub struct PermissionGrantSchema {
    /// `COLLECTION` or `ASSET`.
    #[schema(example = "COLLECTION")]
    scope: String,
    scope_id: String,
    user_id: String,
    permissions: PermissionFlagsSchema,
    #[schema(format = DateTime)]
    updated_at: String,
}

/// Provenance recorded on moved resources.
#[derive(ToSchema)]
#[schema(as = crate::domain::MovedFrom, rename_all = "camelCase")]
pub struct MovedFromSchema {
    vault_id: String,
    collection_id: String,
    asset_id: Option<String>,
    #[schema(format = DateTime)]
    moved_at: String,
    moved_by: String,
}

/// OpenAPI schema for [`crate::domain::Collection`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Collection, rename_all = "camelCase")]
pub struct CollectionSchema {
    id: String,
    name: String,
    description: Option<String>,
    owner_id: String,
    #[schema(format = DateTime)]
    created_at: String,
    #[schema(format = DateTime)]
    last_edited_at: String,
    moved_from: Option<MovedFromSchema>,
}

/// OpenAPI schema for [`crate::domain::Asset`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Asset, rename_all = "camelCase")]
pub struct AssetSchema {
    id: String,
    collection_id: String,
    title: String,
    body: Option<String>,
    #[schema(example = "https://media.example.com/beach.jpg")]
    media_url: Option<String>,
    owner_id: String,
    #[schema(format = DateTime)]
    created_at: String,
    #[schema(format = DateTime)]
    last_edited_at: String,
    moved_from: Option<MovedFromSchema>,
}

/// OpenAPI schema for [`crate::domain::Invitation`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Invitation, rename_all = "camelCase")]
pub struct InvitationSchema {
    /// `{vaultId}.{secret}`.
    #[schema(example = "vault-1.Zk3mQ8rT2vX9bN4cL7pW1sYd")]
    code: String,
    vault_id: String,
    email: String,
    invited_by: String,
    /// `PENDING`, `ACCEPTED`, `REVOKED` or `EXPIRED`.
    status: String,
    permissions: PermissionFlagsSchema,
    #[schema(format = DateTime)]
    created_at: String,
    #[schema(format = DateTime)]
    expires_at: String,
    accepted_by: Option<String>,
}

/// OpenAPI schema for [`crate::domain::MoveJob`].
#[derive(ToSchema)]
#[schema(as = crate::domain::MoveJob, rename_all = "camelCase")]
pub struct MoveJobSchema {
    id: String,
    actor_id: String,
    source_vault_id: String,
    source_collection_id: String,
    target_vault_id: String,
    target_collection_id: String,
    /// `creatingDestination`, `migratingAssets`, `deletingSource`,
    /// `purgingGrants`, `completed` or `failed`.
    #[schema(example = "migratingAssets")]
    phase: String,
    moved_assets: u64,
    renamed_assets: u64,
    error: Option<String>,
}

/// OpenAPI schema for [`crate::domain::DeletionJob`].
#[derive(ToSchema)]
#[schema(as = crate::domain::DeletionJob, rename_all = "camelCase")]
pub struct DeletionJobSchema {
    id: String,
    user_id: String,
    /// `queued`, `running`, `completed` or `failed`.
    #[schema(example = "queued")]
    status: String,
    attempts: u32,
    #[schema(format = DateTime)]
    requested_at: String,
    vaults_deleted: u64,
    memberships_removed: u64,
}

/// OpenAPI schema for [`crate::domain::Subscription`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Subscription, rename_all = "camelCase")]
pub struct SubscriptionSchema {
    /// `BASIC`, `PREMIUM` or `PRO`.
    #[schema(example = "PREMIUM")]
    tier: String,
    #[schema(example = "active")]
    status: String,
    product_id: Option<String>,
    #[schema(format = DateTime)]
    expires_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::PartialSchema;

    fn schema_to_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[test]
    fn error_code_schema_lists_every_code() {
        let json = schema_to_json::<ErrorCodeSchema>();
        for code in [
            "invalid_request",
            "unauthorized",
            "payment_required",
            "forbidden",
            "not_found",
            "conflict",
            "gone",
            "too_many_requests",
            "service_unavailable",
            "internal_error",
        ] {
            assert!(json.contains(code), "missing {code}");
        }
    }

    #[test]
    fn error_schema_uses_envelope_field_names() {
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
        let json = schema_to_json::<ErrorSchema>();
        assert!(json.contains("\"error\""));
        assert!(json.contains("traceId"));
    }

    #[test]
    fn resource_schemas_use_camel_case() {
        assert!(schema_to_json::<AssetSchema>().contains("collectionId"));
        assert!(schema_to_json::<MoveJobSchema>().contains("targetVaultId"));
    }
}
