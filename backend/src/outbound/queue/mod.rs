//! In-process deletion job queue backed by a Tokio channel.
//!
//! The queue only carries job ids. Job state lives in the document store, so
//! anything lost with the process is re-enqueued by start-up recovery.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::JobId;
use crate::domain::ports::{DeletionJobHandler, DeletionJobQueue, JobDispatchError};

/// Default number of job ids buffered before `enqueue` waits.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Sending half handed to the account service.
#[derive(Debug, Clone)]
pub struct TokioDeletionQueue {
    sender: mpsc::Sender<JobId>,
}

impl TokioDeletionQueue {
    /// Spawn the worker task and return the queue feeding it.
    ///
    /// Jobs run one at a time in arrival order. The worker exits once every
    /// queue handle has been dropped and the buffer is drained.
    pub fn spawn(
        handler: Arc<dyn DeletionJobHandler>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<JobId>(capacity.max(1));
        let worker = tokio::spawn(async move {
            info!("account deletion worker started");
            while let Some(job_id) = receiver.recv().await {
                debug!(%job_id, "deletion job dequeued");
                handler.run(&job_id).await;
            }
            info!("account deletion worker stopped");
        });
        (Self { sender }, worker)
    }
}

#[async_trait]
impl DeletionJobQueue for TokioDeletionQueue {
    async fn enqueue(&self, job_id: &JobId) -> Result<(), JobDispatchError> {
        self.sender
            .send(job_id.clone())
            .await
            .map_err(|_| JobDispatchError::unavailable("deletion worker has stopped"))
    }
}
