//! Daily rate quotas.
//!
//! Each vault has one counter document per UTC day. Checking the ceiling and
//! incrementing the counter happen inside a single store transaction, so
//! concurrent callers can never push a counter past its limit.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{debug, info};

use super::audit::AuditLog;
use super::paths;
use super::ports::{DocumentStore, TxPlan, WriteOp, patch, run_transaction};
use super::vault::quota_day_key;
use super::{
    DailyQuotaRecord, Error, PlanResolver, QuotaKind, ResolvedPlan, UserId, Vault, VaultId,
};

/// Result of the check-then-increment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tally {
    Granted { total: u64 },
    Denied { current: u64 },
}

/// Enforces the per-day operation ceilings of a vault's tier.
#[derive(Clone)]
pub struct QuotaManager {
    store: Arc<dyn DocumentStore>,
    plans: PlanResolver,
    audit: AuditLog,
    clock: Arc<dyn Clock>,
    enforced: bool,
}

impl QuotaManager {
    /// Build an enforcing manager; see [`QuotaManager::with_enforcement`].
    pub fn new(
        store: Arc<dyn DocumentStore>,
        plans: PlanResolver,
        audit: AuditLog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            plans,
            audit,
            clock,
            enforced: true,
        }
    }

    /// Turn enforcement on or off. Disabled quotas never read or write.
    #[must_use]
    pub fn with_enforcement(mut self, enforced: bool) -> Self {
        self.enforced = enforced;
        self
    }

    /// Load the vault, then consume `delta` units of `kind`.
    pub async fn assert_and_increment(
        &self,
        vault_id: &VaultId,
        actor: &UserId,
        kind: QuotaKind,
        delta: u64,
    ) -> Result<ResolvedPlan, Error> {
        let doc = self
            .store
            .get(&paths::vault(vault_id))
            .await?
            .ok_or_else(|| Error::not_found("Vault not found"))?;
        let vault: Vault = doc.decode()?;
        self.consume(&vault, actor, kind, delta).await
    }

    /// Resolve the vault's plan and consume `delta` units of `kind`.
    ///
    /// Returns the resolved plan so callers can reuse it for capacity checks.
    pub async fn consume(
        &self,
        vault: &Vault,
        actor: &UserId,
        kind: QuotaKind,
        delta: u64,
    ) -> Result<ResolvedPlan, Error> {
        let plan = self.plans.resolve(vault).await?;
        self.consume_with_plan(&vault.id, &plan, actor, kind, delta)
            .await?;
        Ok(plan)
    }

    /// Consume `delta` units of `kind` against an already resolved plan.
    pub async fn consume_with_plan(
        &self,
        vault_id: &VaultId,
        plan: &ResolvedPlan,
        actor: &UserId,
        kind: QuotaKind,
        delta: u64,
    ) -> Result<(), Error> {
        if !self.enforced || delta == 0 {
            return Ok(());
        }
        let day = self.clock.utc().date_naive();
        let day_key = quota_day_key(day);
        let path = paths::daily_quota(vault_id, day);
        let max = plan.limits().daily(kind);

        let tally = run_transaction(
            self.store.as_ref(),
            std::slice::from_ref(&path),
            |snapshot| -> Result<TxPlan<Tally>, Error> {
                let record: DailyQuotaRecord = snapshot.decode(&path)?.unwrap_or_default();
                let current = record.get(kind);
                let total = current.saturating_add(delta);
                if total > max {
                    return Ok(TxPlan::read_only(Tally::Denied { current }));
                }
                let write = WriteOp::merge(
                    path.clone(),
                    patch([
                        (kind.field(), json!(total)),
                        ("date", json!(day_key)),
                    ]),
                );
                Ok(TxPlan::new(vec![write], Tally::Granted { total }))
            },
        )
        .await?;

        match tally {
            Tally::Granted { total } => {
                debug!(vault_id = %vault_id, kind = kind.as_str(), total, max, "quota consumed");
                Ok(())
            }
            Tally::Denied { current } => {
                info!(vault_id = %vault_id, %actor, kind = kind.as_str(), current, max, "daily quota exceeded");
                let details = json!({
                    "current": current,
                    "max": max,
                    "tier": plan.tier().as_str(),
                    "field": kind.limit_name(),
                    "kind": kind.as_str(),
                });
                self.audit
                    .record_quota_denial(vault_id, plan, actor, kind, details.clone())
                    .await;
                Err(Error::too_many_requests(format!(
                    "Daily {} quota exceeded",
                    kind.as_str()
                ))
                .with_details(details))
            }
        }
    }
}
