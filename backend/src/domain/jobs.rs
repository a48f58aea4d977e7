//! Durable job records for resumable collection moves and account deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CollectionId, JobId, UserId, VaultId};

/// Next step a collection move will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MovePhase {
    CreatingDestination,
    MigratingAssets,
    DeletingSource,
    PurgingGrants,
    Completed,
    Failed,
}

impl MovePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Collection move job stored at `vaults/{source}/moveJobs/{j}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveJob {
    pub id: JobId,
    pub actor_id: UserId,
    pub source_vault_id: VaultId,
    pub source_collection_id: CollectionId,
    pub target_vault_id: VaultId,
    pub target_collection_id: CollectionId,
    pub phase: MovePhase,
    /// Phase to re-enter when a failed job is resumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_phase: Option<MovePhase>,
    /// Path of the last source asset migrated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub moved_assets: u64,
    pub renamed_assets: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status of an account deletion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl DeletionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A best-effort step that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFailure {
    pub step: String,
    pub message: String,
}

/// Account deletion job stored at `deletionJobs/{j}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionJob {
    pub id: JobId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: DeletionStatus,
    pub attempts: u32,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub vaults_deleted: u64,
    #[serde(default)]
    pub memberships_removed: u64,
    #[serde(default)]
    pub failures: Vec<StepFailure>,
}

impl DeletionJob {
    pub fn queued(id: JobId, user_id: UserId, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            email,
            status: DeletionStatus::Queued,
            attempts: 0,
            requested_at: now,
            started_at: None,
            finished_at: None,
            vaults_deleted: 0,
            memberships_removed: 0,
            failures: Vec::new(),
        }
    }
}
