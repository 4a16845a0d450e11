//! # Aggregation Engine
//!
//! Derives a document's status from the outcomes of its current round:
//!
//! 1. any `rejected` task rejects the document (other pending tasks are left as-is)
//! 2. otherwise, all tasks `approved` validates it
//! 3. otherwise the document stays in flight, keeping its in-progress marker
//!
//! Evaluation is idempotent and runs only for in-flight documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WorkflowResult;
use crate::models::{Document, NewDocumentTransition, WorkflowTask};
use crate::state_machine::{DocumentEvent, DocumentStateMachine, DocumentStatus, TaskStatus};

/// Combined outcome of one round's tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    Rejected,
    Validated,
    Pending,
}

impl RoundOutcome {
    fn event(self) -> DocumentEvent {
        match self {
            Self::Rejected => DocumentEvent::Rejected,
            Self::Validated => DocumentEvent::AllApproved,
            Self::Pending => DocumentEvent::StillPending,
        }
    }
}

/// Pure aggregation over the tasks of a single round
pub fn aggregate(tasks: &[WorkflowTask]) -> RoundOutcome {
    if tasks.iter().any(|task| task.status == TaskStatus::Rejected) {
        return RoundOutcome::Rejected;
    }
    if !tasks.is_empty() && tasks.iter().all(|task| task.status == TaskStatus::Approved) {
        return RoundOutcome::Validated;
    }
    RoundOutcome::Pending
}

/// Counts of the current round, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub document_id: Uuid,
    pub round: u32,
    pub status: DocumentStatus,
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub outcome: RoundOutcome,
}

impl RoundSummary {
    pub fn from_round(document: &Document, tasks: &[WorkflowTask]) -> Self {
        let current: Vec<WorkflowTask> = tasks
            .iter()
            .filter(|task| task.round == document.current_round)
            .cloned()
            .collect();
        let count = |status: TaskStatus| current.iter().filter(|t| t.status == status).count();

        Self {
            document_id: document.document_id,
            round: document.current_round,
            status: document.status,
            total: current.len(),
            pending: count(TaskStatus::Pending),
            approved: count(TaskStatus::Approved),
            rejected: count(TaskStatus::Rejected),
            outcome: aggregate(&current),
        }
    }

    pub fn completion_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.approved + self.rejected) as f64 / self.total as f64
    }
}

pub struct AggregationEngine;

impl AggregationEngine {
    /// Re-evaluate `document` against its round's tasks
    ///
    /// Tasks of other rounds are ignored. Returns the audit row when the status
    /// changed; `None` for no change or for documents not in flight.
    pub fn evaluate(
        document: &mut Document,
        tasks: &[WorkflowTask],
        now: DateTime<Utc>,
    ) -> WorkflowResult<Option<NewDocumentTransition>> {
        if !document.status.is_in_flight() {
            return Ok(None);
        }

        let current: Vec<WorkflowTask> = tasks
            .iter()
            .filter(|task| task.round == document.current_round)
            .cloned()
            .collect();
        let outcome = aggregate(&current);

        Ok(DocumentStateMachine::apply(document, &outcome.event(), now)?)
    }
}
