//! Domain primitives, policies and services.
//!
//! Purpose: model vaults, memberships, plans and resources as strongly typed
//! values, evaluate permissions and quotas over them, and orchestrate every
//! mutation through the [`ports::DocumentStore`] transaction primitive.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - `can_perform`: pure permission evaluation.
//! - `QuotaManager`, `check_capacity`: daily rate quotas and capacity caps.
//! - `*Service` types: driving port implementations used by the HTTP layer.

pub mod access;
pub mod account_service;
pub mod audit;
pub mod billing_service;
pub mod caller;
pub mod deletion;
pub mod error;
pub mod governance;
pub mod ids;
pub mod invitation;
pub mod invitation_service;
pub mod jobs;
pub mod membership;
pub mod membership_service;
pub mod move_service;
pub mod notifications;
pub mod paths;
pub mod permissions;
pub mod plans;
pub mod ports;
pub mod purge;
pub mod quota;
pub mod resource_service;
pub mod tier;
pub mod trace_id;
pub mod usage;
pub mod vault;
pub mod vault_service;

pub use self::access::{GrantTarget, VaultAccess};
pub use self::account_service::{AccountDeletionWorker, AccountService};
pub use self::audit::{AuditEvent, AuditEventType, AuditLog};
pub use self::billing_service::{BillingService, DowngradeReport, downgrade_cleanup};
pub use self::caller::Caller;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::governance::Governance;
pub use self::ids::{AssetId, CollectionId, IdValidationError, InvitationCode, JobId, UserId, VaultId};
pub use self::invitation::{INVITATION_TTL_DAYS, Invitation, InvitationStatus};
pub use self::invitation_service::InvitationService;
pub use self::jobs::{DeletionJob, DeletionStatus, MoveJob, MovePhase, StepFailure};
pub use self::membership::{
    GrantScope, Membership, MembershipStatus, PermissionFlags, PermissionGrant, Role,
};
pub use self::membership_service::MembershipService;
pub use self::move_service::{MOVE_PAGE_SIZE, MoveService};
pub use self::notifications::{DeliveryOutcome, Notifier, NotificationSettings};
pub use self::permissions::{Action, Decision, DenialReason, PermissionContext, can_perform};
pub use self::plans::PlanResolver;
pub use self::quota::QuotaManager;
pub use self::resource_service::ResourceService;
pub use self::tier::{
    CapacityField, PlanSource, QuotaKind, ResolvedPlan, Subscription, SubscriptionStatus, Tier,
    TierLimits,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::usage::{UsageLedger, check_capacity};
pub use self::vault::{Asset, Collection, DailyQuotaRecord, MovedFrom, Page, UsageCounters, Vault};
pub use self::vault_service::VaultService;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use vault_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
