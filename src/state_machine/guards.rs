use super::errors::{guard_failed, StateMachineResult};
use crate::models::{Document, WorkflowTask};

/// Trait for implementing state transition guards
pub trait StateGuard<T> {
    /// Check if a transition is allowed
    fn check(&self, entity: &T) -> StateMachineResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard to check the document may be submitted (draft, or rejected for a resubmission)
pub struct SubmittableGuard;

impl StateGuard<Document> for SubmittableGuard {
    fn check(&self, document: &Document) -> StateMachineResult<()> {
        if document.status.can_submit() {
            return Ok(());
        }
        Err(guard_failed(format!(
            "Document {} cannot be submitted from status {}",
            document.document_id, document.status
        )))
    }

    fn description(&self) -> &'static str {
        "Document must be draft or rejected to be submitted"
    }
}

/// Guard to check the document is in flight and accepts validator decisions
pub struct AcceptsDecisionsGuard;

impl StateGuard<Document> for AcceptsDecisionsGuard {
    fn check(&self, document: &Document) -> StateMachineResult<()> {
        if document.status.accepts_decisions() {
            return Ok(());
        }
        Err(guard_failed(format!(
            "Document {} does not accept decisions in status {}",
            document.document_id, document.status
        )))
    }

    fn description(&self) -> &'static str {
        "Document must be awaiting validation to record decisions"
    }
}

/// Guard to check a dependency may be spawned: awaiting validation, no outstanding link
pub struct DependencySlotFreeGuard;

impl StateGuard<Document> for DependencySlotFreeGuard {
    fn check(&self, document: &Document) -> StateMachineResult<()> {
        if !document.status.can_assign_dependency() {
            return Err(guard_failed(format!(
                "Document {} cannot spawn a dependency from status {}",
                document.document_id, document.status
            )));
        }
        if let Some(linked) = document.linked_document_id {
            return Err(guard_failed(format!(
                "Document {} already linked to document {linked}",
                document.document_id
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Document must be awaiting validation with no outstanding dependency"
    }
}

/// Guard to check a task is still waiting for its validator
pub struct PendingTaskGuard;

impl StateGuard<WorkflowTask> for PendingTaskGuard {
    fn check(&self, task: &WorkflowTask) -> StateMachineResult<()> {
        if task.is_pending() {
            return Ok(());
        }
        Err(guard_failed(format!(
            "Task {} already decided ({})",
            task.workflow_task_id, task.status
        )))
    }

    fn description(&self) -> &'static str {
        "Task must be pending"
    }
}

/// Guard to check a task belongs to the document's current round
pub struct CurrentRoundGuard {
    pub current_round: u32,
}

impl StateGuard<WorkflowTask> for CurrentRoundGuard {
    fn check(&self, task: &WorkflowTask) -> StateMachineResult<()> {
        if task.round == self.current_round {
            return Ok(());
        }
        Err(guard_failed(format!(
            "Task {} belongs to round {}, current round is {}",
            task.workflow_task_id, task.round, self.current_round
        )))
    }

    fn description(&self) -> &'static str {
        "Task must belong to the current validation round"
    }
}
