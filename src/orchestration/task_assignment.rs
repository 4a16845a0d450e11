//! # Task Assignment
//!
//! Opens a validation round: one `pending` task per validator, in the order
//! given, and moves the document to `pending_validation`.
//!
//! Planning is pure. The caller commits the returned [`ChangeSet`], so tasks,
//! the document status and its audit row become visible together.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::database::ChangeSet;
use crate::error::WorkflowResult;
use crate::models::{Document, ValidatorId, WorkflowTask};
use crate::state_machine::guards::{StateGuard, SubmittableGuard};
use crate::state_machine::{DocumentEvent, DocumentStateMachine};
use crate::validation::validate_validator_set;

/// A planned submission round, ready to commit
#[derive(Debug, Clone)]
pub struct RoundAssignment {
    /// Document as it will be after the commit
    pub document: Document,
    /// New tasks ordered by step
    pub tasks: Vec<WorkflowTask>,
    pub changes: ChangeSet,
}

pub struct TaskAssignment;

impl TaskAssignment {
    /// Plan the next validation round for `document`
    ///
    /// Fails with `InvalidState` unless the document is `draft` or `rejected`,
    /// and with `EmptyValidatorSet` / `DuplicateValidator` for a bad set.
    pub fn plan_round(
        document: &Document,
        validators: &[ValidatorId],
        now: DateTime<Utc>,
    ) -> WorkflowResult<RoundAssignment> {
        SubmittableGuard.check(document)?;
        validate_validator_set(validators)?;

        let mut document = document.clone();
        let round = document.current_round + 1;
        let transition =
            DocumentStateMachine::apply(&mut document, &DocumentEvent::Submit { round }, now)?;
        document.current_round = round;

        let tasks: Vec<WorkflowTask> = validators
            .iter()
            .zip(1u32..)
            .map(|(validator, step)| {
                WorkflowTask::pending(document.document_id, validator.clone(), round, step, now)
            })
            .collect();

        debug!(
            document_id = %document.document_id,
            round = round,
            validators = tasks.len(),
            "Planned validation round"
        );

        let mut changes = ChangeSet::new();
        changes.update_document(document.clone()).record_transition(transition);
        for task in &tasks {
            changes.upsert_task(task.clone());
        }

        // The committed row carries the bumped version
        if let Some(written) = changes.written_document(document.document_id) {
            document.lock_version = written.lock_version;
        }

        Ok(RoundAssignment {
            document,
            tasks,
            changes,
        })
    }
}
