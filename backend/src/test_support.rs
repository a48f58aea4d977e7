//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled when running tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    DeletionJobQueue, EmailDelivery, EmailError, EmailSender, IdentityDirectory, IdentityError,
    JobDispatchError, OutboundEmail, ReceiptError, ReceiptVerification, ReceiptVerifier,
};
use crate::domain::{
    AccountDeletionWorker, AccountService, BillingService, Caller, Governance, InvitationService,
    JobId, MembershipService, MoveService, ResourceService, UserId, VaultService,
};
use crate::inbound::http::state::HttpStatePorts;
use crate::outbound::cache::BoundedDedupeCache;
use crate::outbound::persistence::InMemoryDocumentStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Clock whose current instant tests move by hand.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *lock(&self.0) = now;
    }

    pub fn advance_days(&self, days: i64) {
        *lock(&self.0) += TimeDelta::days(days);
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Midday on a fixed date, far from any UTC day boundary.
pub fn fixed_now() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0) {
        chrono::LocalResult::Single(now) => now,
        _ => panic!("fixed timestamp is valid"),
    }
}

/// Email sender that keeps every message it is asked to deliver.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingEmailSender {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<EmailDelivery, EmailError> {
        lock(&self.sent).push(email.clone());
        Ok(EmailDelivery { sent: true })
    }
}

/// Receipt verifier answering from a table of registered receipts.
#[derive(Default)]
pub struct ScriptedReceiptVerifier {
    receipts: Mutex<HashMap<String, ReceiptVerification>>,
}

impl ScriptedReceiptVerifier {
    pub fn register(&self, receipt: &str, verification: ReceiptVerification) {
        lock(&self.receipts).insert(receipt.to_owned(), verification);
    }
}

#[async_trait]
impl ReceiptVerifier for ScriptedReceiptVerifier {
    async fn verify(&self, receipt: &str) -> Result<ReceiptVerification, ReceiptError> {
        lock(&self.receipts)
            .get(receipt)
            .cloned()
            .ok_or_else(|| ReceiptError::invalid(format!("unknown receipt {receipt}")))
    }
}

/// Identity directory recording the users it was asked to delete.
#[derive(Default)]
pub struct RecordingIdentityDirectory {
    deleted: Mutex<Vec<UserId>>,
}

impl RecordingIdentityDirectory {
    pub fn deleted(&self) -> Vec<UserId> {
        lock(&self.deleted).clone()
    }
}

#[async_trait]
impl IdentityDirectory for RecordingIdentityDirectory {
    async fn delete_user(&self, user_id: &UserId) -> Result<(), IdentityError> {
        let mut deleted = lock(&self.deleted);
        if deleted.contains(user_id) {
            return Err(IdentityError::not_found(user_id.as_str()));
        }
        deleted.push(user_id.clone());
        Ok(())
    }
}

/// Queue that holds job ids until a test drains them.
#[derive(Default)]
pub struct RecordingDeletionQueue {
    jobs: Mutex<Vec<JobId>>,
}

impl RecordingDeletionQueue {
    pub fn drain(&self) -> Vec<JobId> {
        std::mem::take(&mut *lock(&self.jobs))
    }
}

#[async_trait]
impl DeletionJobQueue for RecordingDeletionQueue {
    async fn enqueue(&self, job_id: &JobId) -> Result<(), JobDispatchError> {
        lock(&self.jobs).push(job_id.clone());
        Ok(())
    }
}

/// Caller with a derived example email address.
pub fn caller(user_id: &str) -> Caller {
    let id = match UserId::new(user_id) {
        Ok(id) => id,
        Err(error) => panic!("invalid test user id {user_id}: {error}"),
    };
    Caller::new(id, Some(format!("{user_id}@example.com")))
}

/// Domain services wired over the in-memory store and recording doubles.
pub struct TestHarness {
    pub store: Arc<InMemoryDocumentStore>,
    pub clock: Arc<MutableClock>,
    pub email: Arc<RecordingEmailSender>,
    pub receipts: Arc<ScriptedReceiptVerifier>,
    pub directory: Arc<RecordingIdentityDirectory>,
    pub queue: Arc<RecordingDeletionQueue>,
    pub governance: Governance,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_quotas(true)
    }

    pub fn with_quotas(enforced: bool) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        let clock = Arc::new(MutableClock::new(fixed_now()));
        let email = Arc::new(RecordingEmailSender::default());
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let suppression = Arc::new(BoundedDedupeCache::with_defaults(shared_clock.clone()));
        let governance = Governance::new(
            store.clone(),
            shared_clock,
            email.clone(),
            suppression,
            enforced,
        );
        Self {
            store,
            clock,
            email,
            receipts: Arc::new(ScriptedReceiptVerifier::default()),
            directory: Arc::new(RecordingIdentityDirectory::default()),
            queue: Arc::new(RecordingDeletionQueue::default()),
            governance,
        }
    }

    pub fn vaults(&self) -> VaultService {
        VaultService::new(self.governance.clone())
    }

    pub fn resources(&self) -> ResourceService {
        ResourceService::new(self.governance.clone())
    }

    pub fn moves(&self) -> MoveService {
        MoveService::new(self.governance.clone())
    }

    pub fn invitations(&self) -> InvitationService {
        InvitationService::new(self.governance.clone())
    }

    pub fn members(&self) -> MembershipService {
        MembershipService::new(self.governance.clone())
    }

    pub fn account(&self) -> AccountService {
        AccountService::new(self.governance.clone(), self.queue.clone())
    }

    pub fn deletion_worker(&self) -> AccountDeletionWorker {
        AccountDeletionWorker::new(self.governance.clone(), self.directory.clone())
    }

    pub fn billing(&self) -> BillingService {
        BillingService::new(self.governance.clone(), self.receipts.clone())
    }

    /// Driving ports for building an `HttpState` over this harness.
    pub fn ports(&self) -> HttpStatePorts {
        let vaults = Arc::new(self.vaults());
        let resources = Arc::new(self.resources());
        HttpStatePorts {
            vaults: vaults.clone(),
            vaults_query: vaults,
            resources: resources.clone(),
            resources_query: resources,
            moves: Arc::new(self.moves()),
            invitations: Arc::new(self.invitations()),
            members: Arc::new(self.members()),
            account: Arc::new(self.account()),
            billing: Arc::new(self.billing()),
        }
    }
}

pub mod openapi {
    //! OpenAPI schema traversal helpers.

    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::{Object, Schema};

    /// Extract an `Object` schema, panicking with a diagnostic if not an Object.
    pub fn unwrap_object_schema<'a>(schema: &'a RefOr<Schema>, name: &str) -> &'a Object {
        match schema {
            RefOr::T(Schema::Object(obj)) => obj,
            RefOr::Ref(reference) => {
                panic!(
                    "schema '{name}' is a $ref to '{}'; resolve the reference first",
                    reference.ref_location
                );
            }
            RefOr::T(Schema::Array(_)) => {
                panic!("schema '{name}' is an Array, not an Object");
            }
            _ => panic!("schema '{name}' is not a plain Object"),
        }
    }
}
