//! Port for outbound email delivery.

use async_trait::async_trait;
use serde::Serialize;

use super::define_port_error;

define_port_error! {
    /// Errors raised by email delivery adapters.
    pub enum EmailError {
        /// The provider refused or failed the request.
        Rejected { message: String } => "email rejected: {message}",
        /// The provider could not be reached.
        Unavailable { message: String } => "email provider unavailable: {message}",
    }
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivery receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailDelivery {
    pub sent: bool,
}

/// Sends transactional email. Failures never fail the calling operation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<EmailDelivery, EmailError>;
}

/// Sender used when no provider is configured: logs and reports `sent: false`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledEmailSender;

#[async_trait]
impl EmailSender for DisabledEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<EmailDelivery, EmailError> {
        tracing::info!(subject = %email.subject, "email delivery disabled; message dropped");
        Ok(EmailDelivery { sent: false })
    }
}
