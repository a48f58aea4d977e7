//! Usage counters and capacity caps.
//!
//! Counters are cached aggregates. When the document is missing it is
//! recomputed once from full counts and created only if still absent, so a
//! concurrent increment that landed first is never overwritten. Mutations
//! re-read the counters inside their own transaction and re-check the cap
//! there; [`UsageLedger::ensure`] is only the fast path.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::paths;
use super::ports::{DocumentStore, Query, StoreError, TxSnapshot, WriteOp, encode_value};
use super::{CapacityField, Error, ResolvedPlan, UsageCounters, VaultId};

/// Reads and lazily initialises a vault's usage counters.
#[derive(Clone)]
pub struct UsageLedger {
    store: Arc<dyn DocumentStore>,
}

impl UsageLedger {
    /// Wrap the store holding `vaults/{v}/usage/counters`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Load the counters, computing and persisting them if absent.
    pub async fn ensure(&self, vault_id: &VaultId) -> Result<UsageCounters, Error> {
        let path = paths::counters(vault_id);
        if let Some(doc) = self.store.get(&path).await? {
            return Ok(doc.decode()?);
        }
        let counters = self.recompute(vault_id).await?;
        if self
            .store
            .create_if_absent(&path, encode_value(&counters)?)
            .await?
        {
            info!(vault_id = %vault_id, ?counters, "usage counters initialised");
            return Ok(counters);
        }
        match self.store.get(&path).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Ok(counters),
        }
    }

    /// Count every asset, collection and active delegate.
    pub async fn recompute(&self, vault_id: &VaultId) -> Result<UsageCounters, Error> {
        let assets_count = self
            .store
            .count(&Query::collection(paths::assets(vault_id)))
            .await?;
        let collections_count = self
            .store
            .count(&Query::collection(paths::collections(vault_id)))
            .await?;
        let delegates_count = self
            .store
            .count(
                &Query::collection(paths::members(vault_id))
                    .where_eq("role", "DELEGATE")
                    .where_eq("status", "ACTIVE"),
            )
            .await?;
        Ok(UsageCounters {
            assets_count,
            collections_count,
            delegates_count,
        })
    }
}

/// Counters as seen inside a transaction; absent documents read as zero.
pub fn counters_in(snapshot: &TxSnapshot, vault_id: &VaultId) -> Result<UsageCounters, StoreError> {
    Ok(snapshot
        .decode(&paths::counters(vault_id))?
        .unwrap_or_default())
}

/// Replace the counters document.
pub fn write_counters(vault_id: &VaultId, counters: &UsageCounters) -> Result<WriteOp, StoreError> {
    WriteOp::put(paths::counters(vault_id), counters)
}

/// Fail with `403` if adding `delta` to `field` would exceed the plan's cap.
///
/// # Examples
/// ```
/// use vault_backend::domain::{check_capacity, CapacityField, ResolvedPlan, UsageCounters};
///
/// let counters = UsageCounters { collections_count: 200, ..UsageCounters::default() };
/// let err = check_capacity(&ResolvedPlan::basic(), &counters, CapacityField::Collections, 1)
///     .expect_err("BASIC allows 200 collections");
/// assert_eq!(err.details().unwrap()["limit"], 200);
/// ```
pub fn check_capacity(
    plan: &ResolvedPlan,
    counters: &UsageCounters,
    field: CapacityField,
    delta: u64,
) -> Result<(), Error> {
    let limit = plan.limits().capacity(field);
    let current = counters.get(field);
    if current.saturating_add(delta) <= limit {
        return Ok(());
    }
    Err(Error::forbidden(format!(
        "Plan limit reached for {}",
        field.limit_name()
    ))
    .with_details(json!({
        "limit": limit,
        "current": current,
        "tier": plan.tier().as_str(),
        "field": field.limit_name(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode, PlanSource, Subscription, SubscriptionStatus, Tier};
    use rstest::rstest;

    fn paid(tier: Tier) -> ResolvedPlan {
        let subscription = Subscription {
            tier,
            status: SubscriptionStatus::Active,
            product_id: None,
            expires_at: None,
            transaction_id: None,
            updated_at: None,
        };
        ResolvedPlan::from_subscription(&subscription, PlanSource::OwnerSubscription)
    }

    #[rstest]
    #[case(Tier::Basic, 0, true)]
    #[case(Tier::Basic, 1, false)]
    #[case(Tier::Premium, 4, true)]
    #[case(Tier::Pro, 20, false)]
    fn delegate_caps(#[case] tier: Tier, #[case] current: u64, #[case] ok: bool) {
        let counters = UsageCounters {
            delegates_count: current,
            ..UsageCounters::default()
        };
        let result = check_capacity(&paid(tier), &counters, CapacityField::Delegates, 1);
        assert_eq!(result.is_ok(), ok);
    }

    #[rstest]
    fn cap_errors_carry_diagnostics() {
        let counters = UsageCounters {
            assets_count: 1_000,
            ..UsageCounters::default()
        };
        let err = check_capacity(&ResolvedPlan::basic(), &counters, CapacityField::Assets, 1)
            .expect_err("at cap");
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(
            err.details(),
            Some(&json!({"limit": 1000, "current": 1000, "tier": "BASIC", "field": "maxAssets"}))
        );
    }
}
