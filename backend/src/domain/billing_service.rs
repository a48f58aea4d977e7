//! Receipt-driven subscription updates and downgrade cleanup.
//!
//! When a caller's subscription moves from paid to unpaid, every vault they
//! own loses its delegate features: active delegates are revoked, grants are
//! deleted and pending invitations are revoked. Collections, assets and the
//! owner membership are left alone. Each step is best-effort and re-running
//! the cleanup is harmless.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::audit::AuditEventType;
use crate::domain::governance::Governance;
use crate::domain::paths;
use crate::domain::ports::{
    BillingCommand, DocumentStore, Query, ReceiptVerifier, SubmitReceiptRequest,
    SubmitReceiptResponse, encode_value,
};
use crate::domain::purge::{purge_matching, scan_all, update_matching};
use crate::domain::{
    Caller, Error, InvitationStatus, MembershipStatus, Subscription, SubscriptionStatus, Tier,
    UserId, Vault, VaultId,
};

/// What downgrade cleanup removed from one vault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DowngradeReport {
    pub delegates_revoked: u64,
    pub grants_deleted: u64,
    pub invitations_revoked: u64,
    /// Steps that failed and were skipped.
    pub failed_steps: u32,
}

fn tally<E: std::fmt::Display>(
    report: &mut DowngradeReport,
    vault_id: &VaultId,
    step: &str,
    result: Result<u64, E>,
) -> u64 {
    match result {
        Ok(count) => count,
        Err(error) => {
            warn!(vault_id = %vault_id, step, %error, "downgrade cleanup step failed");
            report.failed_steps += 1;
            0
        }
    }
}

/// Strip delegate features from `vault_id`.
pub async fn downgrade_cleanup(
    store: &dyn DocumentStore,
    vault_id: &VaultId,
    now: DateTime<Utc>,
) -> DowngradeReport {
    let mut report = DowngradeReport::default();

    let delegates = Query::collection(paths::members(vault_id))
        .where_eq("role", "DELEGATE")
        .where_eq("status", "ACTIVE");
    let revoked = update_matching(
        store,
        &delegates,
        &json!({ "status": MembershipStatus::Revoked, "updatedAt": now }),
    )
    .await;
    report.delegates_revoked = tally(&mut report, vault_id, "revoke_delegates", revoked);

    // Absent counters are recomputed on next use; a partial document is not.
    let counters_path = paths::counters(vault_id);
    let counters = match store.get(&counters_path).await {
        Ok(Some(_)) => store
            .set(&counters_path, json!({ "delegatesCount": 0 }), true)
            .await
            .map(|()| 0),
        Ok(None) => Ok(0),
        Err(error) => Err(error),
    };
    tally(&mut report, vault_id, "reset_delegate_count", counters);

    let grants = purge_matching(store, &Query::collection(paths::grants(vault_id))).await;
    report.grants_deleted = tally(&mut report, vault_id, "delete_grants", grants);

    let pending = Query::collection(paths::invitations(vault_id)).where_eq("status", "PENDING");
    let invitations = update_matching(
        store,
        &pending,
        &json!({ "status": InvitationStatus::Revoked, "revokedAt": now }),
    )
    .await;
    report.invitations_revoked = tally(&mut report, vault_id, "revoke_invitations", invitations);

    info!(vault_id = %vault_id, ?report, "downgrade cleanup finished");
    report
}

/// Implements [`BillingCommand`].
#[derive(Clone)]
pub struct BillingService {
    governance: Governance,
    verifier: Arc<dyn ReceiptVerifier>,
}

impl BillingService {
    pub fn new(governance: Governance, verifier: Arc<dyn ReceiptVerifier>) -> Self {
        Self {
            governance,
            verifier,
        }
    }

    async fn owned_vaults(&self, user_id: &UserId) -> Result<Vec<Vault>, Error> {
        let query = Query::collection(paths::vaults()).where_eq("ownerId", user_id.as_str());
        scan_all(self.governance.store.as_ref(), &query)
            .await?
            .iter()
            .map(|doc| doc.decode::<Vault>().map_err(Error::from))
            .collect()
    }
}

#[async_trait]
impl BillingCommand for BillingService {
    async fn submit_receipt(
        &self,
        request: SubmitReceiptRequest,
    ) -> Result<SubmitReceiptResponse, Error> {
        let SubmitReceiptRequest { caller, receipt } = request;
        if receipt.trim().is_empty() {
            return Err(Error::invalid_request("receipt is required")
                .with_details(json!({ "field": "receipt", "reason": "required" })));
        }
        let verified = self.verifier.verify(&receipt).await?;
        let now = self.governance.clock.utc();
        let status = match verified.expires_at {
            Some(expires_at) if expires_at <= now => SubscriptionStatus::Expired,
            _ => verified.status,
        };
        let subscription = Subscription {
            tier: Tier::from_product_id(&verified.product_id).unwrap_or(Tier::Basic),
            status,
            product_id: Some(verified.product_id),
            expires_at: verified.expires_at,
            transaction_id: Some(verified.transaction_id),
            updated_at: Some(now),
        };

        let previous = self
            .governance
            .plans
            .user_subscription(&caller.user_id)
            .await?;
        let was_paid = previous.as_ref().is_some_and(Subscription::is_paid);
        self.governance
            .store
            .set(
                &paths::subscription(&caller.user_id),
                encode_value(&subscription)?,
                false,
            )
            .await?;
        info!(user_id = %caller.user_id, tier = subscription.tier.as_str(), ?status, "subscription updated");

        let audit = &self.governance.audit;
        audit
            .record_user_event(
                &caller.user_id,
                AuditEventType::SubscriptionUpdated,
                json!({
                    "tier": subscription.tier.as_str(),
                    "status": subscription.status,
                    "productId": subscription.product_id,
                    "previousStatus": previous.as_ref().map(|previous| previous.status),
                }),
            )
            .await;

        let downgraded = was_paid && !subscription.is_paid();
        let mut vaults_cleaned = 0;
        if downgraded {
            let store = self.governance.store.as_ref();
            for vault in self.owned_vaults(&caller.user_id).await? {
                let report = downgrade_cleanup(store, &vault.id, now).await;
                vaults_cleaned += 1;
                audit
                    .record_user_event(
                        &caller.user_id,
                        AuditEventType::DowngradeCleanup,
                        json!({ "vaultId": vault.id, "report": report }),
                    )
                    .await;
            }
        }

        Ok(SubmitReceiptResponse {
            subscription,
            downgraded,
            vaults_cleaned,
        })
    }

    async fn subscription(&self, caller: Caller) -> Result<Option<Subscription>, Error> {
        self.governance
            .plans
            .user_subscription(&caller.user_id)
            .await
    }
}
