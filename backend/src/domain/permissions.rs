//! Permission evaluation over already-fetched membership and grant records.
//!
//! Evaluation is pure: callers load the caller's membership and any relevant
//! grant, then ask [`can_perform`] for a [`Decision`]. Rules apply in order:
//!
//! 1. No membership, or a revoked one, denies.
//! 2. The owner role, or being the vault's recorded owner, allows.
//! 3. The vault-level baseline flag for the action allows.
//! 4. A resource-scoped grant with the action flag allows.
//! 5. Anything else denies with the missing capability named.

use serde::{Deserialize, Serialize};

use super::{Error, Membership, PermissionGrant, Role};

/// Capability being exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Read collections and assets.
    View,
    /// Add collections or assets.
    Create,
    /// Remove or move collections and assets.
    Delete,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Create => "Create",
            Self::Delete => "Delete",
        }
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The caller has no membership in the vault.
    NotMember,
    /// The membership exists but has been revoked.
    MembershipInactive,
    /// Neither the baseline flags nor a scoped grant cover the action.
    PermissionRequired(Action),
}

impl DenialReason {
    /// Client-facing message, e.g. `Delete permission required`.
    pub fn message(self) -> String {
        match self {
            Self::NotMember => "not a member".to_owned(),
            Self::MembershipInactive => "membership inactive".to_owned(),
            Self::PermissionRequired(action) => format!("{} permission required", action.label()),
        }
    }
}

impl From<DenialReason> for Error {
    fn from(value: DenialReason) -> Self {
        Error::forbidden(value.message())
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

impl Decision {
    /// True when the action may proceed.
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Convert a denial into a `403` domain error.
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(reason) => Err(reason.into()),
        }
    }
}

/// Inputs for [`can_perform`].
#[derive(Debug, Clone, Copy)]
pub struct PermissionContext<'a> {
    /// The caller's membership in the vault, if any.
    pub membership: Option<&'a Membership>,
    /// Grants for the target resource, most specific first.
    pub grants: &'a [PermissionGrant],
    /// The caller is the vault document's recorded owner.
    pub is_vault_owner: bool,
}

/// Evaluate whether the caller may perform `action`.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use vault_backend::domain::{
///     can_perform, Action, Decision, Membership, PermissionContext, PermissionFlags, UserId,
/// };
///
/// let member = Membership::delegate(
///     UserId::new("u1").unwrap(),
///     None,
///     PermissionFlags::VIEW_ONLY,
///     Utc::now(),
/// );
/// let ctx = PermissionContext { membership: Some(&member), grants: &[], is_vault_owner: false };
/// assert!(can_perform(ctx, Action::View).is_allowed());
/// assert!(!can_perform(ctx, Action::Delete).is_allowed());
/// ```
pub fn can_perform(ctx: PermissionContext<'_>, action: Action) -> Decision {
    let Some(membership) = ctx.membership else {
        return Decision::Denied(DenialReason::NotMember);
    };
    if !membership.is_active() {
        return Decision::Denied(DenialReason::MembershipInactive);
    }
    if membership.role == Role::Owner || ctx.is_vault_owner {
        return Decision::Allowed;
    }
    if membership.permissions.allows(action) {
        return Decision::Allowed;
    }
    let granted = ctx
        .grants
        .iter()
        .any(|grant| grant.user_id == membership.user_id && grant.permissions.allows(action));
    if granted {
        Decision::Allowed
    } else {
        Decision::Denied(DenialReason::PermissionRequired(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GrantScope, MembershipStatus, PermissionFlags, UserId};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    fn user(raw: &str) -> UserId {
        UserId::new(raw).expect("fixture user id")
    }

    #[fixture]
    fn delegate() -> Membership {
        Membership::delegate(user("d1"), None, PermissionFlags::VIEW_ONLY, Utc::now())
    }

    fn grant(user_id: &str, permissions: PermissionFlags) -> PermissionGrant {
        PermissionGrant {
            scope: GrantScope::Asset,
            scope_id: "a1".to_owned(),
            user_id: user(user_id),
            permissions,
            updated_at: Utc::now(),
        }
    }

    fn ctx<'a>(membership: Option<&'a Membership>, grants: &'a [PermissionGrant]) -> PermissionContext<'a> {
        PermissionContext {
            membership,
            grants,
            is_vault_owner: false,
        }
    }

    #[rstest]
    fn missing_membership_is_not_a_member() {
        let decision = can_perform(ctx(None, &[]), Action::View);
        assert_eq!(decision, Decision::Denied(DenialReason::NotMember));
    }

    #[rstest]
    fn revoked_membership_is_inactive(mut delegate: Membership) {
        delegate.status = MembershipStatus::Revoked;
        delegate.permissions = PermissionFlags::ALL;
        let decision = can_perform(ctx(Some(&delegate), &[]), Action::View);
        assert_eq!(decision, Decision::Denied(DenialReason::MembershipInactive));
    }

    #[rstest]
    #[case(Action::View)]
    #[case(Action::Create)]
    #[case(Action::Delete)]
    fn owners_may_do_anything(#[case] action: Action) {
        let owner = Membership::owner(user("o1"), None, Utc::now());
        let mut restricted = owner.clone();
        restricted.permissions = PermissionFlags::default();
        assert!(can_perform(ctx(Some(&restricted), &[]), action).is_allowed());
    }

    #[rstest]
    fn recorded_owner_shortcut_allows(delegate: Membership) {
        let context = PermissionContext {
            membership: Some(&delegate),
            grants: &[],
            is_vault_owner: true,
        };
        assert!(can_perform(context, Action::Delete).is_allowed());
    }

    #[rstest]
    #[case(Action::Create, "Create permission required")]
    #[case(Action::Delete, "Delete permission required")]
    fn baseline_denial_names_the_capability(
        delegate: Membership,
        #[case] action: Action,
        #[case] message: &str,
    ) {
        match can_perform(ctx(Some(&delegate), &[]), action) {
            Decision::Denied(reason) => assert_eq!(reason.message(), message),
            Decision::Allowed => panic!("expected denial"),
        }
    }

    #[rstest]
    fn scoped_grant_overrides_baseline(delegate: Membership) {
        let grants = [grant("d1", PermissionFlags { delete: true, ..PermissionFlags::default() })];
        assert!(can_perform(ctx(Some(&delegate), &grants), Action::Delete).is_allowed());
        assert!(!can_perform(ctx(Some(&delegate), &grants), Action::Create).is_allowed());
    }

    #[rstest]
    fn grants_for_other_users_are_ignored(delegate: Membership) {
        let grants = [grant("someone-else", PermissionFlags::ALL)];
        assert!(!can_perform(ctx(Some(&delegate), &grants), Action::Delete).is_allowed());
    }

    #[rstest]
    fn denial_converts_to_forbidden() {
        let err = Decision::Denied(DenialReason::NotMember)
            .into_result()
            .expect_err("denied");
        assert_eq!(err.code(), crate::domain::ErrorCode::Forbidden);
        assert_eq!(err.message(), "not a member");
    }
}
