//! Port describing dispatch of account deletion jobs off the request path.

use async_trait::async_trait;

use crate::domain::JobId;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by the job queue adapter.
    pub enum JobDispatchError {
        /// Queue infrastructure is unavailable or shut down.
        Unavailable { message: String } => "deletion queue is unavailable: {message}",
        /// The job could not be accepted.
        Rejected { message: String } => "deletion job was rejected: {message}",
    }
}

/// Accepts job ids for background execution.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeletionJobQueue: Send + Sync {
    async fn enqueue(&self, job_id: &JobId) -> Result<(), JobDispatchError>;
}

/// Executes a queued job. Implemented by the account deletion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeletionJobHandler: Send + Sync {
    async fn run(&self, job_id: &JobId);
}
