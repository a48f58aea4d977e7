//! Invitation records and their state machine.
//!
//! ```text
//! PENDING --accept--------> ACCEPTED
//! PENDING --revoke(owner)--> REVOKED
//! PENDING --read past TTL--> EXPIRED
//! ```

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use super::ids::INVITATION_SECRET_LEN;
use super::{Error, IdValidationError, InvitationCode, PermissionFlags, UserId, VaultId};

/// Invitations lapse this long after creation.
pub const INVITATION_TTL_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Revoked,
    Expired,
}

/// Invitation stored at `vaults/{v}/invitations/{code}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub code: InvitationCode,
    pub vault_id: VaultId,
    pub email: String,
    pub invited_by: UserId,
    pub status: InvitationStatus,
    pub permissions: PermissionFlags,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// A fresh pending invitation valid for [`INVITATION_TTL_DAYS`].
    pub fn pending(
        code: InvitationCode,
        email: String,
        invited_by: UserId,
        permissions: PermissionFlags,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            vault_id: code.vault_id().clone(),
            code,
            email,
            invited_by,
            status: InvitationStatus::Pending,
            permissions,
            created_at: now,
            expires_at: now + Duration::days(INVITATION_TTL_DAYS),
            accepted_by: None,
            accepted_at: None,
            revoked_at: None,
        }
    }

    /// Pending but past its TTL; the next write should persist `EXPIRED`.
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending && now >= self.expires_at
    }

    /// Apply lazy expiry. Returns `true` if the status changed.
    pub fn expire_if_lapsed(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_lapsed(now) {
            self.status = InvitationStatus::Expired;
            true
        } else {
            false
        }
    }

    /// Whether `email` is the address this invitation was issued to.
    pub fn is_addressed_to(&self, email: &str) -> bool {
        normalize_email(email) == normalize_email(&self.email)
    }
}

/// Canonical form used for invitation address comparisons.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Minimal shape check for invitee addresses.
pub fn validate_email(email: &str) -> Result<String, Error> {
    let normalized = normalize_email(email);
    let valid = normalized.len() <= 254
        && normalized
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            })
        && !normalized.chars().any(char::is_whitespace);
    if valid {
        Ok(normalized)
    } else {
        Err(Error::invalid_request("A valid email address is required")
            .with_details(serde_json::json!({ "field": "email", "reason": "invalid_email" })))
    }
}

/// Mint an unguessable code bound to `vault_id`.
pub fn generate_code(vault_id: &VaultId) -> Result<InvitationCode, IdValidationError> {
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITATION_SECRET_LEN)
        .map(char::from)
        .collect();
    InvitationCode::from_parts(vault_id, &secret)
}
