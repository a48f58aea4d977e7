//! Shared collaborators used by every vault service.

use std::sync::Arc;

use mockable::Clock;

use super::access::VaultAccess;
use super::audit::AuditLog;
use super::notifications::Notifier;
use super::ports::{DedupeCache, DocumentStore, EmailSender};
use super::quota::QuotaManager;
use super::usage::UsageLedger;
use super::{Caller, Error, PlanResolver, VaultId};

/// Store, clock and the policy components layered over them.
#[derive(Clone)]
pub struct Governance {
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
    pub plans: PlanResolver,
    pub usage: UsageLedger,
    pub quotas: QuotaManager,
    pub audit: AuditLog,
    pub notifier: Notifier,
}

impl Governance {
    /// Wire the policy components over `store`.
    ///
    /// `suppression` backs quota-denial audit suppression; `quotas_enforced`
    /// is the operational override for daily rate quotas.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        email: Arc<dyn EmailSender>,
        suppression: Arc<dyn DedupeCache>,
        quotas_enforced: bool,
    ) -> Self {
        let plans = PlanResolver::new(store.clone());
        let usage = UsageLedger::new(store.clone());
        let audit = AuditLog::new(store.clone(), plans.clone(), clock.clone(), suppression);
        let quotas = QuotaManager::new(store.clone(), plans.clone(), audit.clone(), clock.clone())
            .with_enforcement(quotas_enforced);
        let notifier = Notifier::new(store.clone(), email, clock.clone());
        Self {
            store,
            clock,
            plans,
            usage,
            quotas,
            audit,
            notifier,
        }
    }

    /// Load `vault_id` and the caller's membership in it.
    pub async fn access(&self, vault_id: &VaultId, caller: &Caller) -> Result<VaultAccess, Error> {
        VaultAccess::load(self.store.as_ref(), vault_id, caller).await
    }
}
