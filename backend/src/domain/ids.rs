//! Validated identifiers for vaults, users, resources and jobs.
//!
//! Identifiers become document path segments, so none may contain `/`.
//! User ids additionally exclude `:` because grant document ids are
//! `{scope}:{scopeId}:{userId}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of any identifier.
pub const ID_MAX_LEN: usize = 128;

/// Validation errors raised when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },
    #[error("{kind} must be at most {max} characters")]
    TooLong { kind: &'static str, max: usize },
    #[error("{kind} contains an invalid character: {found:?}")]
    InvalidCharacter { kind: &'static str, found: char },
}

fn validate(
    kind: &'static str,
    raw: &str,
    allowed: fn(char) -> bool,
) -> Result<(), IdValidationError> {
    if raw.is_empty() {
        return Err(IdValidationError::Empty { kind });
    }
    if raw.chars().count() > ID_MAX_LEN {
        return Err(IdValidationError::TooLong {
            kind,
            max: ID_MAX_LEN,
        });
    }
    match raw.chars().find(|ch| !allowed(*ch)) {
        Some(found) => Err(IdValidationError::InvalidCharacter { kind, found }),
        None => Ok(()),
    }
}

fn resource_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn user_char(ch: char) -> bool {
    !ch.is_whitespace() && !ch.is_control() && ch != '/' && ch != ':'
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $allowed:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap `raw`.
            pub fn new(raw: impl Into<String>) -> Result<Self, IdValidationError> {
                let raw = raw.into();
                validate($kind, &raw, $allowed)?;
                Ok(Self(raw))
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

macro_rules! generated_identifier {
    ($name:ident) => {
        impl $name {
            /// Mint a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }
        }
    };
}

identifier!(
    /// Tenant container identifier.
    VaultId, "vault id", resource_char
);
identifier!(
    /// Stable user identifier issued by the identity provider.
    UserId, "user id", user_char
);
identifier!(
    /// Collection identifier, unique within a vault.
    CollectionId, "collection id", resource_char
);
identifier!(
    /// Asset identifier, unique within a vault.
    AssetId, "asset id", resource_char
);
identifier!(
    /// Move or deletion job identifier.
    JobId, "job id", resource_char
);

generated_identifier!(VaultId);
generated_identifier!(CollectionId);
generated_identifier!(AssetId);
generated_identifier!(JobId);

impl JobId {
    /// Job ids double as correlation ids when they are UUIDs.
    pub fn as_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.0).ok()
    }
}

/// Invitation code of the form `{vaultId}.{secret}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvitationCode {
    raw: String,
    vault_id: VaultId,
}

/// Length of the random part of an invitation code.
pub const INVITATION_SECRET_LEN: usize = 24;

impl InvitationCode {
    /// Parse a code and recover the vault it belongs to.
    ///
    /// # Examples
    /// ```
    /// use vault_backend::domain::InvitationCode;
    ///
    /// let code = InvitationCode::parse("vault-1.abcDEF123").expect("valid code");
    /// assert_eq!(code.vault_id().as_str(), "vault-1");
    /// ```
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdValidationError> {
        let raw = raw.into();
        let Some((vault, secret)) = raw.split_once('.') else {
            return Err(IdValidationError::InvalidCharacter {
                kind: "invitation code",
                found: '?',
            });
        };
        validate("invitation code", secret, |ch| ch.is_ascii_alphanumeric())?;
        let vault_id = VaultId::new(vault)?;
        Ok(Self { raw, vault_id })
    }

    /// Build a code for `vault_id` from an already generated secret.
    pub fn from_parts(vault_id: &VaultId, secret: &str) -> Result<Self, IdValidationError> {
        Self::parse(format!("{vault_id}.{secret}"))
    }

    /// Vault embedded in the code.
    pub fn vault_id(&self) -> &VaultId {
        &self.vault_id
    }

    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }
}

impl fmt::Display for InvitationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<InvitationCode> for String {
    fn from(value: InvitationCode) -> Self {
        value.raw
    }
}

impl TryFrom<String> for InvitationCode {
    type Error = IdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
