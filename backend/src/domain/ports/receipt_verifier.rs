//! Port for third-party billing receipt verification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Error, SubscriptionStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised by receipt verification adapters.
    pub enum ReceiptError {
        /// The receipt is malformed or not genuine.
        Invalid { message: String } => "receipt rejected: {message}",
        /// The verification service could not be reached.
        Unavailable { message: String } => "receipt verification unavailable: {message}",
    }
}

impl From<ReceiptError> for Error {
    fn from(value: ReceiptError) -> Self {
        match value {
            ReceiptError::Invalid { message } => {
                Error::invalid_request("Receipt could not be verified")
                    .with_details(serde_json::json!({ "reason": message }))
            }
            ReceiptError::Unavailable { message } => {
                tracing::error!(%message, "receipt verification unavailable");
                Error::service_unavailable("Receipt verification unavailable")
            }
        }
    }
}

/// Verified facts extracted from a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptVerification {
    pub status: SubscriptionStatus,
    pub product_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub transaction_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReceiptVerifier: Send + Sync {
    async fn verify(&self, receipt: &str) -> Result<ReceiptVerification, ReceiptError>;
}

/// Verifier used when billing is not configured: every receipt is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledReceiptVerifier;

#[async_trait]
impl ReceiptVerifier for DisabledReceiptVerifier {
    async fn verify(&self, _receipt: &str) -> Result<ReceiptVerification, ReceiptError> {
        Err(ReceiptError::unavailable("receipt verification is not configured"))
    }
}
