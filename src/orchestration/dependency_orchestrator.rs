//! # Dependency Orchestrator
//!
//! Lets a validator pause their task while a prerequisite ("child") document
//! is produced and validated, then resumes the parent automatically.
//!
//! ## Links
//!
//! While paused, the parent's `linked_document_id` names the child and the
//! child's names the parent. Resuming clears the parent side; the child keeps
//! its back-reference for audit. A document that is itself a child already has
//! a link and therefore cannot spawn a dependency of its own.
//!
//! ## Child rejection
//!
//! A rejected child is handled by [`ChildRejectionPolicy`]: either the parent
//! stays paused until the child is resubmitted and validated, or the parent
//! resumes with its originating task rejected so aggregation rejects it.
//!
//! Both planners are pure and return a [`ChangeSet`] for the caller to commit.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::ChildRejectionPolicy;
use crate::constants::system::CHILD_REJECTED_COMMENT;
use crate::database::ChangeSet;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{Document, NewDocument, WorkflowTask};
use crate::orchestration::aggregation::AggregationEngine;
use crate::state_machine::guards::{
    CurrentRoundGuard, DependencySlotFreeGuard, PendingTaskGuard, StateGuard,
};
use crate::state_machine::{
    DocumentEvent, DocumentStateMachine, DocumentStatus, TaskEvent, TaskStateMachine,
};

/// A planned dependency spawn
#[derive(Debug, Clone)]
pub struct DependencyInitiation {
    /// Parent after the commit (`en_attente_dependance`, linked to the child)
    pub parent: Document,
    /// New `draft` child linked back to the parent
    pub child: Document,
    /// Originating task, still `pending`, recording the child
    pub task: WorkflowTask,
    pub changes: ChangeSet,
}

/// How a terminal child resolved its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Child validated; the originating task is actionable again
    Resumed,
    /// Child rejected under `reject_parent`; the originating task was rejected
    RejectedByChild,
}

/// A planned parent resumption
#[derive(Debug, Clone)]
pub struct DependencyResolution {
    pub kind: ResolutionKind,
    /// Parent after the commit, already re-aggregated
    pub parent: Document,
    /// Originating task as written, if it was still open
    pub task: Option<WorkflowTask>,
    pub changes: ChangeSet,
}

pub struct DependencyOrchestrator;

impl DependencyOrchestrator {
    /// Plan pausing `parent` on a new child created from `child_draft`
    ///
    /// `task` must be a pending task of the parent's current round and the
    /// parent must be `pending_validation` with no outstanding dependency.
    pub fn plan_initiation(
        parent: &Document,
        task: &WorkflowTask,
        child_draft: NewDocument,
        now: DateTime<Utc>,
    ) -> WorkflowResult<DependencyInitiation> {
        if task.document_id != parent.document_id {
            return Err(WorkflowError::InvalidState(format!(
                "Task {} does not belong to document {}",
                task.workflow_task_id, parent.document_id
            )));
        }
        DependencySlotFreeGuard.check(parent)?;
        PendingTaskGuard.check(task)?;
        CurrentRoundGuard {
            current_round: parent.current_round,
        }
        .check(task)?;

        let mut child = Document::from_draft(child_draft, now);
        child.linked_document_id = Some(parent.document_id);

        let mut parent = parent.clone();
        let transition = DocumentStateMachine::apply(
            &mut parent,
            &DocumentEvent::SpawnDependency {
                child_document_id: child.document_id,
            },
            now,
        )?;
        parent.linked_document_id = Some(child.document_id);

        let mut task = task.clone();
        task.spawned_document_id = Some(child.document_id);

        // Child row first: the parent's link references it
        let mut changes = ChangeSet::new();
        changes
            .insert_document(child.clone())
            .record_transition(Some(DocumentStateMachine::initial_transition(&child)))
            .update_document(parent.clone())
            .record_transition(transition)
            .upsert_task(task.clone());
        parent.lock_version += 1;

        debug!(
            parent_id = %parent.document_id,
            child_id = %child.document_id,
            workflow_task_id = %task.workflow_task_id,
            "Planned dependency initiation"
        );

        Ok(DependencyInitiation {
            parent,
            child,
            task,
            changes,
        })
    }

    /// Plan the parent's reaction to `child`, given the parent's current-round tasks
    ///
    /// Returns `None` when there is nothing to do: the parent is not paused on
    /// this child, the child is not terminal, or the child was rejected under
    /// `remain_paused`. Replaying a resolution is therefore harmless.
    pub fn plan_resolution(
        parent: &Document,
        parent_tasks: &[WorkflowTask],
        child: &Document,
        policy: ChildRejectionPolicy,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Option<DependencyResolution>> {
        if parent.status != DocumentStatus::AwaitingDependency
            || !parent.is_waiting_on(child.document_id)
        {
            debug!(
                parent_id = %parent.document_id,
                child_id = %child.document_id,
                parent_status = %parent.status,
                "Parent not paused on this child; nothing to resolve"
            );
            return Ok(None);
        }

        let kind = match (child.status, policy) {
            (DocumentStatus::Validated, _) => ResolutionKind::Resumed,
            (DocumentStatus::Rejected, ChildRejectionPolicy::RejectParent) => {
                ResolutionKind::RejectedByChild
            }
            (DocumentStatus::Rejected, ChildRejectionPolicy::RemainPaused) => {
                info!(
                    parent_id = %parent.document_id,
                    child_id = %child.document_id,
                    "Child rejected; parent remains paused until the child is validated"
                );
                return Ok(None);
            }
            _ => return Ok(None),
        };

        let mut parent = parent.clone();
        let resume = DocumentStateMachine::apply(
            &mut parent,
            &DocumentEvent::DependencyResolved {
                child_document_id: child.document_id,
            },
            now,
        )?;
        parent.linked_document_id = None;

        let mut tasks: Vec<WorkflowTask> = parent_tasks
            .iter()
            .filter(|task| task.round == parent.current_round)
            .cloned()
            .collect();

        let mut touched = None;
        if let Some(task) = tasks
            .iter_mut()
            .find(|task| task.originated(child.document_id) && task.is_pending())
        {
            match kind {
                ResolutionKind::Resumed => task.assigned_at = now,
                ResolutionKind::RejectedByChild => {
                    TaskStateMachine::apply(
                        task,
                        &TaskEvent::Reject(Some(CHILD_REJECTED_COMMENT.to_string())),
                        now,
                    )?;
                }
            }
            touched = Some(task.clone());
        }

        let aggregated = AggregationEngine::evaluate(&mut parent, &tasks, now)?;

        let mut changes = ChangeSet::new();
        changes
            .update_document(parent.clone())
            .record_transition(resume)
            .record_transition(aggregated);
        if let Some(task) = &touched {
            changes.upsert_task(task.clone());
        }
        parent.lock_version += 1;

        info!(
            parent_id = %parent.document_id,
            child_id = %child.document_id,
            parent_status = %parent.status,
            resolution = ?kind,
            "Planned dependency resolution"
        );

        Ok(Some(DependencyResolution {
            kind,
            parent,
            task: touched,
            changes,
        }))
    }
}
