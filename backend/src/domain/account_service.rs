//! Account deletion: durable jobs, the background worker and start-up
//! recovery.
//!
//! Requests only record a queued [`DeletionJob`] and hand its id to the
//! queue. The worker then tears the account down step by step. Every step is
//! best-effort: a failure is noted on the job and later steps still run, and
//! re-running a job only repeats deletes that are already no-ops.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, warn};

use crate::domain::audit::AuditEventType;
use crate::domain::deletion::delete_vault_tree;
use crate::domain::governance::Governance;
use crate::domain::paths;
use crate::domain::ports::{
    AccountCommand, DeletionJobHandler, DeletionJobQueue, IdentityDirectory, IdentityError,
    Query, TxPlan, WriteOp, encode_value, run_transaction,
};
use crate::domain::purge::{purge_matching, purge_user_grants, scan_all};
use crate::domain::usage::{counters_in, write_counters};
use crate::domain::{
    Caller, CapacityField, DeletionJob, DeletionStatus, Error, JobId, Membership, StepFailure,
    TraceId, UserId, Vault, VaultId,
};

/// Implements [`AccountCommand`].
#[derive(Clone)]
pub struct AccountService {
    governance: Governance,
    queue: Arc<dyn DeletionJobQueue>,
}

impl AccountService {
    pub fn new(governance: Governance, queue: Arc<dyn DeletionJobQueue>) -> Self {
        Self { governance, queue }
    }

    /// Re-enqueue jobs left queued or running by a previous process.
    pub async fn recover_pending(&self) -> Result<usize, Error> {
        let store = self.governance.store.as_ref();
        let mut recovered = 0;
        for status in [DeletionStatus::Queued, DeletionStatus::Running] {
            let query = Query::collection(paths::deletion_jobs()).where_eq("status", status.as_str());
            for doc in scan_all(store, &query).await? {
                let job: DeletionJob = doc.decode()?;
                match self.queue.enqueue(&job.id).await {
                    Ok(()) => recovered += 1,
                    Err(error) => warn!(job_id = %job.id, %error, "could not re-enqueue deletion job"),
                }
            }
        }
        if recovered > 0 {
            info!(recovered, "recovered account deletion jobs");
        }
        Ok(recovered)
    }
}

#[async_trait]
impl AccountCommand for AccountService {
    async fn request_deletion(&self, caller: Caller) -> Result<DeletionJob, Error> {
        let job = DeletionJob::queued(
            JobId::generate(),
            caller.user_id.clone(),
            caller.email.clone(),
            self.governance.clock.utc(),
        );
        self.governance
            .store
            .set(&paths::deletion_job(&job.id), encode_value(&job)?, false)
            .await?;
        self.governance
            .audit
            .record_user_event(
                &caller.user_id,
                AuditEventType::AccountDeletionRequested,
                json!({ "jobId": job.id }),
            )
            .await;
        // The job record is durable; recovery picks it up if dispatch fails.
        if let Err(error) = self.queue.enqueue(&job.id).await {
            warn!(job_id = %job.id, %error, "deletion job not dispatched; left for recovery");
        }
        info!(job_id = %job.id, user_id = %caller.user_id, "account deletion queued");
        Ok(job)
    }

    async fn deletion_job(&self, caller: Caller, job_id: JobId) -> Result<DeletionJob, Error> {
        let not_found = || Error::not_found("Deletion job not found");
        let doc = self
            .governance
            .store
            .get(&paths::deletion_job(&job_id))
            .await?
            .ok_or_else(not_found)?;
        let job: DeletionJob = doc.decode()?;
        if job.user_id != caller.user_id {
            return Err(not_found());
        }
        Ok(job)
    }
}

/// Runs account deletion jobs handed over by the queue.
#[derive(Clone)]
pub struct AccountDeletionWorker {
    governance: Governance,
    identity: Arc<dyn IdentityDirectory>,
}

/// Vaults the user owns and vaults where they are only a member.
#[derive(Debug, Default)]
struct Footprint {
    owned: BTreeSet<VaultId>,
    member_of: BTreeSet<VaultId>,
}

impl AccountDeletionWorker {
    pub fn new(governance: Governance, identity: Arc<dyn IdentityDirectory>) -> Self {
        Self {
            governance,
            identity,
        }
    }

    async fn load(&self, job_id: &JobId) -> Result<Option<DeletionJob>, Error> {
        match self.governance.store.get(&paths::deletion_job(job_id)).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    async fn save(&self, job: &DeletionJob) -> Result<(), Error> {
        self.governance
            .store
            .set(&paths::deletion_job(&job.id), encode_value(job)?, false)
            .await?;
        Ok(())
    }

    async fn footprint(&self, user_id: &UserId) -> Result<Footprint, Error> {
        let store = self.governance.store.as_ref();
        let mut footprint = Footprint::default();
        let owned = Query::collection(paths::vaults()).where_eq("ownerId", user_id.as_str());
        for doc in scan_all(store, &owned).await? {
            footprint.owned.insert(doc.decode::<Vault>()?.id);
        }
        let memberships = Query::group(paths::MEMBERS).where_eq("userId", user_id.as_str());
        for doc in scan_all(store, &memberships).await? {
            if let Some(vault_id) = paths::vault_id_of(&doc.path) {
                if !footprint.owned.contains(&vault_id) {
                    footprint.member_of.insert(vault_id);
                }
            }
        }
        // Grants can outlive a membership removed by an interrupted run.
        let grants = Query::group(paths::GRANTS).where_eq("userId", user_id.as_str());
        for doc in scan_all(store, &grants).await? {
            if let Some(vault_id) = paths::vault_id_of(&doc.path) {
                if !footprint.owned.contains(&vault_id) {
                    footprint.member_of.insert(vault_id);
                }
            }
        }
        Ok(footprint)
    }

    /// Purge the user's grants, then delete the membership and fix the
    /// delegate counter in one transaction.
    async fn leave_vault(&self, vault_id: &VaultId, user_id: &UserId) -> Result<(), Error> {
        purge_user_grants(self.governance.store.as_ref(), vault_id, user_id).await?;
        let member_path = paths::member(vault_id, user_id);
        let counters_path = paths::counters(vault_id);
        let reads = [member_path.clone(), counters_path.clone()];
        run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<()>, Error> {
                let Some(membership) = snapshot.decode::<Membership>(&member_path)? else {
                    return Ok(TxPlan::read_only(()));
                };
                let mut writes = vec![WriteOp::delete(member_path.clone())];
                if membership.is_active_delegate() && snapshot.exists(&counters_path) {
                    let counters = counters_in(snapshot, vault_id)?
                        .adjusted(CapacityField::Delegates, -1);
                    writes.push(write_counters(vault_id, &counters)?);
                }
                Ok(TxPlan::new(writes, ()))
            },
        )
        .await?;
        Ok(())
    }

    async fn delete_user_records(&self, user_id: &UserId) -> Result<(), Error> {
        let store = self.governance.store.as_ref();
        purge_matching(store, &Query::collection(paths::user_settings(user_id))).await?;
        store.delete(&paths::subscription(user_id)).await?;
        store.delete(&paths::user(user_id)).await?;
        Ok(())
    }

    async fn teardown(&self, job: &mut DeletionJob) {
        let user_id = job.user_id.clone();
        let store = self.governance.store.as_ref();
        let job_id = job.id.clone();
        let mut failures = Vec::new();
        let mut note = |step: String, error: &dyn std::fmt::Display| {
            warn!(%job_id, %step, %error, "account deletion step failed");
            failures.push(StepFailure {
                step,
                message: error.to_string(),
            });
        };

        match self.footprint(&user_id).await {
            Ok(footprint) => {
                for vault_id in &footprint.owned {
                    match delete_vault_tree(store, vault_id).await {
                        Ok(_) => job.vaults_deleted += 1,
                        Err(error) => note(format!("delete_vault:{vault_id}"), &error),
                    }
                }
                for vault_id in &footprint.member_of {
                    match self.leave_vault(vault_id, &user_id).await {
                        Ok(()) => job.memberships_removed += 1,
                        Err(error) => note(format!("remove_membership:{vault_id}"), &error),
                    }
                }
            }
            Err(error) => note("discover_vaults".to_owned(), &error),
        }

        if let Err(error) = self.delete_user_records(&user_id).await {
            note("delete_user_records".to_owned(), &error);
        }
        let audit_log = Query::collection(paths::user_audit_events(&user_id));
        if let Err(error) = purge_matching(store, &audit_log).await {
            note("delete_audit_log".to_owned(), &error);
        }
        let email_events = Query::collection(paths::email_events()).where_eq("userId", user_id.as_str());
        if let Err(error) = purge_matching(store, &email_events).await {
            note("delete_email_events".to_owned(), &error);
        }

        if let Some(email) = job.email.clone() {
            self.governance
                .notifier
                .send_account_deleted(&job.id, &email)
                .await;
        }

        match self.identity.delete_user(&user_id).await {
            Ok(()) | Err(IdentityError::NotFound { .. }) => {}
            Err(error) => note("delete_identity".to_owned(), &error),
        }
        job.failures = failures;
    }

    async fn execute(&self, job_id: &JobId) -> Result<(), Error> {
        let Some(mut job) = self.load(job_id).await? else {
            warn!(%job_id, "deletion job vanished before it ran");
            return Ok(());
        };
        if job.status == DeletionStatus::Completed {
            info!(%job_id, "deletion job already completed");
            return Ok(());
        }
        job.status = DeletionStatus::Running;
        job.attempts += 1;
        job.started_at = Some(self.governance.clock.utc());
        self.save(&job).await?;
        info!(%job_id, user_id = %job.user_id, attempt = job.attempts, "account deletion started");

        self.teardown(&mut job).await;

        job.status = if job.failures.is_empty() {
            DeletionStatus::Completed
        } else {
            DeletionStatus::Failed
        };
        job.finished_at = Some(self.governance.clock.utc());
        self.save(&job).await?;
        info!(
            %job_id,
            status = job.status.as_str(),
            vaults_deleted = job.vaults_deleted,
            memberships_removed = job.memberships_removed,
            failures = job.failures.len(),
            "account deletion finished"
        );
        Ok(())
    }
}

#[async_trait]
impl DeletionJobHandler for AccountDeletionWorker {
    async fn run(&self, job_id: &JobId) {
        let trace_id = job_id
            .as_uuid()
            .map(TraceId::from_uuid)
            .unwrap_or_else(TraceId::generate);
        if let Err(err) = TraceId::scope(trace_id, self.execute(job_id)).await {
            error!(%job_id, error = %err, "account deletion job aborted");
        }
    }
}
