//! Idempotent email notifications.
//!
//! Every message carries a dedupe key. Before sending, the notifier creates
//! `emailEvents/{sha256(key)}` with create-if-absent; only the caller that
//! created the record sends. Retries and duplicate triggers therefore deliver
//! at most one email per key. Delivery failures are logged and recorded on the
//! event document but never fail the calling operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::paths;
use super::ports::{DocumentStore, EmailSender, OutboundEmail, encode_value};
use super::{Invitation, JobId, UserId, Vault};

/// Per-user notification preferences at `users/{uid}/settings/notifications`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub invitation_accepted: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            invitation_accepted: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailEventStatus {
    Pending,
    Sent,
    Failed,
}

/// Dedupe record stored at `emailEvents/{sha256(dedupeKey)}`.
///
/// Records for account deletion confirmations carry no `userId` so they
/// survive the account teardown that precedes the send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailEvent {
    pub dedupe_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub to: String,
    pub subject: String,
    pub status: EmailEventStatus,
    pub created_at: DateTime<Utc>,
}

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// Another trigger already claimed this dedupe key.
    Duplicate,
    /// Suppressed by preferences, not configured, or failed.
    NotSent,
}

impl DeliveryOutcome {
    pub fn was_sent(self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Hex SHA-256 fingerprint of a dedupe key; the email event document id.
pub fn dedupe_fingerprint(dedupe_key: &str) -> String {
    hex::encode(Sha256::digest(dedupe_key.as_bytes()))
}

#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn DocumentStore>,
    sender: Arc<dyn EmailSender>,
    clock: Arc<dyn Clock>,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        sender: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sender,
            clock,
        }
    }

    /// Send `email` at most once for `dedupe_key`.
    pub async fn deliver(
        &self,
        dedupe_key: &str,
        user_id: Option<&UserId>,
        email: OutboundEmail,
    ) -> DeliveryOutcome {
        let path = paths::email_events().doc(&dedupe_fingerprint(dedupe_key));
        let event = EmailEvent {
            dedupe_key: dedupe_key.to_owned(),
            user_id: user_id.cloned(),
            to: email.to.clone(),
            subject: email.subject.clone(),
            status: EmailEventStatus::Pending,
            created_at: self.clock.utc(),
        };
        let claimed = match encode_value(&event) {
            Ok(data) => self.store.create_if_absent(&path, data).await,
            Err(error) => Err(error),
        };
        match claimed {
            Ok(true) => {}
            Ok(false) => {
                info!(%dedupe_key, "notification already delivered for dedupe key");
                return DeliveryOutcome::Duplicate;
            }
            Err(error) => {
                warn!(%dedupe_key, %error, "could not claim notification dedupe record");
                return DeliveryOutcome::NotSent;
            }
        }

        let (status, outcome, failure) = match self.sender.send(&email).await {
            Ok(receipt) if receipt.sent => (EmailEventStatus::Sent, DeliveryOutcome::Sent, None),
            Ok(_) => (EmailEventStatus::Failed, DeliveryOutcome::NotSent, None),
            Err(error) => {
                warn!(%dedupe_key, %error, "email delivery failed");
                (
                    EmailEventStatus::Failed,
                    DeliveryOutcome::NotSent,
                    Some(error.to_string()),
                )
            }
        };
        let mut update = json!({ "status": status, "updatedAt": self.clock.utc() });
        if let Some(message) = failure {
            update["error"] = json!(message);
        }
        if let Err(error) = self.store.set(&path, update, true).await {
            warn!(%dedupe_key, %error, "could not record notification status");
        }
        outcome
    }

    /// Invite `invitation.email` to `vault`.
    pub async fn send_invitation(
        &self,
        invitation: &Invitation,
        vault: &Vault,
        inviter_email: Option<&str>,
    ) -> DeliveryOutcome {
        let key = format!(
            "vault:{}:invite:{}:to:{}",
            vault.id, invitation.code, invitation.email
        );
        let email = invitation_email(invitation, vault, inviter_email);
        self.deliver(&key, Some(&invitation.invited_by), email).await
    }

    /// Tell the owner that `accepted_by` joined, unless they opted out.
    pub async fn send_acceptance(
        &self,
        vault: &Vault,
        owner_email: Option<&str>,
        invitation: &Invitation,
    ) -> DeliveryOutcome {
        let Some(owner_email) = owner_email else {
            return DeliveryOutcome::NotSent;
        };
        match self.settings(&vault.owner_id).await {
            Some(settings) if !settings.invitation_accepted => {
                info!(vault_id = %vault.id, "owner opted out of acceptance emails");
                return DeliveryOutcome::NotSent;
            }
            _ => {}
        }
        let key = format!("vault:{}:accepted:{}", vault.id, invitation.code);
        let email = acceptance_email(vault, owner_email, &invitation.email);
        self.deliver(&key, Some(&vault.owner_id), email).await
    }

    /// Confirm that an account deletion job finished.
    pub async fn send_account_deleted(&self, job_id: &JobId, to: &str) -> DeliveryOutcome {
        let key = format!("account:deleted:{job_id}");
        self.deliver(&key, None, account_deleted_email(to)).await
    }

    async fn settings(&self, user_id: &UserId) -> Option<NotificationSettings> {
        match self.store.get(&paths::notification_settings(user_id)).await {
            Ok(Some(doc)) => doc.decode().ok(),
            Ok(None) => None,
            Err(error) => {
                warn!(%user_id, %error, "could not read notification settings");
                None
            }
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn invitation_email(invitation: &Invitation, vault: &Vault, inviter: Option<&str>) -> OutboundEmail {
    let from = inviter.unwrap_or("A vault owner");
    let expires = invitation.expires_at.format("%Y-%m-%d");
    OutboundEmail {
        to: invitation.email.clone(),
        subject: format!("You've been invited to {}", vault.name),
        text: format!(
            "{from} invited you to the vault \"{}\".\n\nInvitation code: {}\nThis invitation expires on {expires}.",
            vault.name, invitation.code
        ),
        html: format!(
            "<p>{} invited you to the vault <strong>{}</strong>.</p>\
             <p>Invitation code: <code>{}</code></p>\
             <p>This invitation expires on {expires}.</p>",
            escape_html(from),
            escape_html(&vault.name),
            escape_html(invitation.code.as_str()),
        ),
    }
}

fn acceptance_email(vault: &Vault, owner_email: &str, invitee: &str) -> OutboundEmail {
    OutboundEmail {
        to: owner_email.to_owned(),
        subject: format!("{invitee} joined {}", vault.name),
        text: format!("{invitee} accepted your invitation to \"{}\".", vault.name),
        html: format!(
            "<p>{} accepted your invitation to <strong>{}</strong>.</p>",
            escape_html(invitee),
            escape_html(&vault.name)
        ),
    }
}

fn account_deleted_email(to: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_owned(),
        subject: "Your account has been deleted".to_owned(),
        text: "Your account and every vault you owned have been permanently deleted.".to_owned(),
        html: "<p>Your account and every vault you owned have been permanently deleted.</p>"
            .to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn fingerprints_are_stable_hex_digests() {
        let fingerprint = dedupe_fingerprint("vault:v1:invite:v1.abc:to:a@b.co");
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, dedupe_fingerprint("vault:v1:invite:v1.abc:to:a@b.co"));
        assert_ne!(fingerprint, dedupe_fingerprint("vault:v1:invite:v1.abd:to:a@b.co"));
    }

    #[rstest]
    fn html_bodies_escape_user_text() {
        assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }

    #[rstest]
    fn missing_settings_default_to_opted_in() {
        let settings: NotificationSettings =
            serde_json::from_value(json!({})).expect("settings decode");
        assert!(settings.invitation_accepted);
    }
}
