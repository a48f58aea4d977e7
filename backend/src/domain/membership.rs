//! Membership and scoped permission grant records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Action, UserId};

/// Role a member holds inside a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Delegate,
}

/// Lifecycle of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Active,
    Revoked,
}

/// Closed set of capability flags granted at vault or resource scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionFlags {
    pub view: bool,
    pub create: bool,
    pub delete: bool,
}

impl PermissionFlags {
    /// Every capability.
    pub const ALL: Self = Self {
        view: true,
        create: true,
        delete: true,
    };

    /// Read-only access.
    pub const VIEW_ONLY: Self = Self {
        view: true,
        create: false,
        delete: false,
    };

    /// Whether the flag for `action` is set.
    pub fn allows(self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Create => self.create,
            Action::Delete => self.delete,
        }
    }
}

/// A user's standing in one vault, stored at `vaults/{v}/members/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user_id: UserId,
    pub role: Role,
    pub status: MembershipStatus,
    pub permissions: PermissionFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Owner membership created alongside a vault.
    pub fn owner(user_id: UserId, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role: Role::Owner,
            status: MembershipStatus::Active,
            permissions: PermissionFlags::ALL,
            email,
            joined_at: now,
            updated_at: now,
        }
    }

    /// Delegate membership created by accepting an invitation.
    pub fn delegate(
        user_id: UserId,
        email: Option<String>,
        permissions: PermissionFlags,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            role: Role::Delegate,
            status: MembershipStatus::Active,
            permissions,
            email,
            joined_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }

    /// Active delegates count against the tier's delegate cap.
    pub fn is_active_delegate(&self) -> bool {
        self.is_active() && self.role == Role::Delegate
    }
}

/// Resource kind a grant is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantScope {
    Collection,
    Asset,
}

impl GrantScope {
    /// Lower-case token used in grant document ids.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Asset => "asset",
        }
    }
}

impl std::str::FromStr for GrantScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "collection" => Ok(Self::Collection),
            "asset" => Ok(Self::Asset),
            other => Err(format!("unknown grant scope: {other}")),
        }
    }
}

/// Resource-scoped override stored at `vaults/{v}/grants/{scope}:{id}:{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub scope: GrantScope,
    pub scope_id: String,
    pub user_id: UserId,
    pub permissions: PermissionFlags,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_flags_default_to_false() {
        let flags: PermissionFlags = serde_json::from_value(json!({"view": true})).expect("flags");
        assert_eq!(flags, PermissionFlags::VIEW_ONLY);
    }

    #[test]
    fn roles_use_upper_case_wire_names() {
        assert_eq!(serde_json::to_value(Role::Delegate).expect("role"), json!("DELEGATE"));
    }
}
