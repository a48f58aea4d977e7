//! Driving port for account deletion.

use async_trait::async_trait;

use crate::domain::{Caller, DeletionJob, Error, JobId};

/// Queue account teardown and report on it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountCommand: Send + Sync {
    /// Record a deletion job and hand it to the background queue.
    async fn request_deletion(&self, caller: Caller) -> Result<DeletionJob, Error>;

    /// Status of one of the caller's deletion jobs.
    async fn deletion_job(&self, caller: Caller, job_id: JobId) -> Result<DeletionJob, Error>;
}
