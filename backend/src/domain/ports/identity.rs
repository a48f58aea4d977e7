//! Ports for the external identity provider.
//!
//! [`IdentityVerifier`] turns bearer credentials into a [`Caller`];
//! [`IdentityDirectory`] removes identity records during account deletion.

use async_trait::async_trait;

use crate::domain::{Caller, Error, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityError {
        /// The credential is malformed, expired or revoked.
        InvalidToken { message: String } => "invalid credential: {message}",
        /// The user has no identity record.
        NotFound { user_id: String } => "identity {user_id} not found",
        /// The provider could not be reached.
        Unavailable { message: String } => "identity provider unavailable: {message}",
    }
}

impl From<IdentityError> for Error {
    fn from(value: IdentityError) -> Self {
        match value {
            IdentityError::InvalidToken { .. } => Error::unauthorized("Invalid or expired credential"),
            IdentityError::NotFound { .. } => Error::unauthorized("Unknown identity"),
            IdentityError::Unavailable { message } => {
                tracing::error!(%message, "identity provider unavailable");
                Error::service_unavailable("Identity provider unavailable")
            }
        }
    }
}

/// Verifies bearer credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolve `token` to a stable user id and optional email.
    async fn verify(&self, token: &str) -> Result<Caller, IdentityError>;
}

/// Administrative access to identity records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Remove the identity record for `user_id`.
    ///
    /// Returns [`IdentityError::NotFound`] when nothing exists; callers
    /// tearing down accounts treat that as success.
    async fn delete_user(&self, user_id: &UserId) -> Result<(), IdentityError>;
}

/// Directory for deployments without an identity admin API.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityDirectory;

#[async_trait]
impl IdentityDirectory for FixtureIdentityDirectory {
    async fn delete_user(&self, user_id: &UserId) -> Result<(), IdentityError> {
        tracing::info!(%user_id, "identity directory not configured; skipping identity removal");
        Ok(())
    }
}
