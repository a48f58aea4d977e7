//! Resolution of a vault's effective subscription plan.
//!
//! The owner's per-user subscription wins; vaults created before per-user
//! billing fall back to a legacy per-vault record; everything else is an
//! unpaid BASIC plan.

use std::sync::Arc;

use serde_json::json;

use super::paths;
use super::ports::DocumentStore;
use super::{Error, PlanSource, ResolvedPlan, Subscription, UserId, Vault};

#[derive(Clone)]
pub struct PlanResolver {
    store: Arc<dyn DocumentStore>,
}

impl PlanResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Per-user subscription record, if any.
    pub async fn user_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>, Error> {
        match self.store.get(&paths::subscription(user_id)).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// Effective plan for `vault`.
    pub async fn resolve(&self, vault: &Vault) -> Result<ResolvedPlan, Error> {
        if let Some(subscription) = self.user_subscription(&vault.owner_id).await? {
            return Ok(ResolvedPlan::from_subscription(
                &subscription,
                PlanSource::OwnerSubscription,
            ));
        }
        if let Some(doc) = self.store.get(&paths::vault_subscription(&vault.id)).await? {
            let subscription: Subscription = doc.decode()?;
            return Ok(ResolvedPlan::from_subscription(
                &subscription,
                PlanSource::LegacyVaultSubscription,
            ));
        }
        Ok(ResolvedPlan::basic())
    }

    /// Resolve and require a paid plan, failing with `402` otherwise.
    pub async fn assert_paid(&self, vault: &Vault) -> Result<ResolvedPlan, Error> {
        let plan = self.resolve(vault).await?;
        if plan.paid {
            Ok(plan)
        } else {
            Err(payment_required(&plan))
        }
    }
}

/// `402` error describing the plan that blocked a paid feature.
pub fn payment_required(plan: &ResolvedPlan) -> Error {
    Error::payment_required("This feature requires an active paid subscription").with_details(
        json!({
            "tier": plan.subscribed_tier.as_str(),
            "status": plan.status,
        }),
    )
}
