//! # Workflow Task Model
//!
//! One validator's assignment to approve or reject a document within a round.
//!
//! All tasks of a round are concurrent: `step` is a display ordinal only and
//! never gates execution. Rounds are append-only; resubmitting a rejected
//! document creates new tasks with a higher `round` and leaves the old ones
//! untouched for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validator::ValidatorId;
use crate::state_machine::TaskStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTask {
    pub workflow_task_id: Uuid,
    pub document_id: Uuid,
    pub validator_id: ValidatorId,
    pub round: u32,
    /// 1-based insertion order within the round
    pub step: u32,
    pub status: TaskStatus,
    pub comment: Option<String>,
    /// Child document this task spawned instead of deciding directly
    pub spawned_document_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    /// Refreshed when the task is reactivated after a dependency pause
    pub assigned_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl WorkflowTask {
    /// Create a pending task for a validator in the given round
    pub fn pending(
        document_id: Uuid,
        validator_id: ValidatorId,
        round: u32,
        step: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            workflow_task_id: Uuid::new_v4(),
            document_id,
            validator_id,
            round,
            step,
            status: TaskStatus::Pending,
            comment: None,
            spawned_document_id: None,
            created_at: now,
            assigned_at: now,
            validated_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Whether this task is the one that spawned `child_document_id`
    pub fn originated(&self, child_document_id: Uuid) -> bool {
        self.spawned_document_id == Some(child_document_id)
    }

    /// Time the task has been waiting since its (re)assignment
    pub fn waiting_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.assigned_at)
    }
}

/// Sort tasks the way timeline views expect: by round, then by step
pub fn sort_for_timeline(tasks: &mut [WorkflowTask]) {
    tasks.sort_by(|a, b| a.round.cmp(&b.round).then(a.step.cmp(&b.step)));
}
