//! Append-only audit log.
//!
//! Vault events are written only while the vault is on a paid plan; account
//! events are always written. Audit writes never fail the operation that
//! triggered them: store errors are logged at `warn` and dropped.
//!
//! Quota denials are additionally suppressed per `(date, vault, actor, kind)`
//! through an injected [`DedupeCache`], so a client hammering a spent quota
//! produces one audit event per suppression window rather than one per
//! request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::paths;
use super::ports::{DedupeCache, DocumentStore, encode_value};
use super::vault::quota_day_key;
use super::{PlanResolver, QuotaKind, ResolvedPlan, UserId, Vault, VaultId};

/// Kinds of audited events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    VaultCreated,
    OwnershipTransferred,
    CollectionCreated,
    CollectionDeleted,
    AssetCreated,
    AssetDeleted,
    AssetMoved,
    CollectionMoved,
    InvitationCreated,
    InvitationAccepted,
    InvitationRevoked,
    MemberRevoked,
    MemberLeft,
    PermissionsUpdated,
    GrantUpdated,
    GrantDeleted,
    QuotaExceeded,
    DowngradeCleanup,
    SubscriptionUpdated,
    VaultDeleted,
    AccountDeletionRequested,
}

/// Immutable event stored under `vaults/{v}/auditEvents` or
/// `users/{uid}/auditEvents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: AuditEventType,
    pub actor_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_id: Option<VaultId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn DocumentStore>,
    plans: PlanResolver,
    clock: Arc<dyn Clock>,
    suppression: Arc<dyn DedupeCache>,
}

impl AuditLog {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        plans: PlanResolver,
        clock: Arc<dyn Clock>,
        suppression: Arc<dyn DedupeCache>,
    ) -> Self {
        Self {
            store,
            plans,
            clock,
            suppression,
        }
    }

    /// Record a vault event if the vault is currently paid.
    pub async fn record_vault_event(
        &self,
        vault: &Vault,
        actor: &UserId,
        event_type: AuditEventType,
        payload: Value,
    ) {
        match self.plans.resolve(vault).await {
            Ok(plan) => {
                self.record_with_plan(&vault.id, &plan, actor, event_type, payload)
                    .await;
            }
            Err(error) => {
                warn!(vault_id = %vault.id, ?event_type, %error, "audit skipped: plan resolution failed");
            }
        }
    }

    /// Record a vault event against an already resolved plan.
    pub async fn record_with_plan(
        &self,
        vault_id: &VaultId,
        plan: &ResolvedPlan,
        actor: &UserId,
        event_type: AuditEventType,
        payload: Value,
    ) {
        if !plan.paid {
            debug!(vault_id = %vault_id, ?event_type, "audit skipped: vault not on a paid plan");
            return;
        }
        let event = self.event(actor, Some(vault_id.clone()), event_type, payload);
        let path = paths::vault_audit_events(vault_id).doc(&event.id);
        self.write(path, &event).await;
    }

    /// Record an account-level event. Never gated.
    pub async fn record_user_event(&self, user_id: &UserId, event_type: AuditEventType, payload: Value) {
        let event = self.event(user_id, None, event_type, payload);
        let path = paths::user_audit_events(user_id).doc(&event.id);
        self.write(path, &event).await;
    }

    /// Record a quota denial unless one was recorded recently for the same
    /// day, vault, actor and kind.
    pub async fn record_quota_denial(
        &self,
        vault_id: &VaultId,
        plan: &ResolvedPlan,
        actor: &UserId,
        kind: QuotaKind,
        payload: Value,
    ) {
        let key = format!(
            "{}:{vault_id}:{actor}:{}",
            quota_day_key(self.clock.utc().date_naive()),
            kind.as_str()
        );
        if !self.suppression.first_sighting(&key).await {
            debug!(%key, "quota denial audit suppressed");
            return;
        }
        self.record_with_plan(vault_id, plan, actor, AuditEventType::QuotaExceeded, payload)
            .await;
    }

    fn event(
        &self,
        actor: &UserId,
        vault_id: Option<VaultId>,
        event_type: AuditEventType,
        payload: Value,
    ) -> AuditEvent {
        AuditEvent {
            id: Uuid::new_v4().to_string(),
            event_type,
            actor_id: actor.clone(),
            vault_id,
            created_at: self.clock.utc(),
            payload,
        }
    }

    async fn write(&self, path: super::ports::DocPath, event: &AuditEvent) {
        let result = match encode_value(event) {
            Ok(data) => self.store.set(&path, data, false).await,
            Err(error) => Err(error),
        };
        if let Err(error) = result {
            warn!(%path, event_type = ?event.event_type, %error, "audit write failed");
        }
    }
}
