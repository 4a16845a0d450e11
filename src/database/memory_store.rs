//! # In-Memory Workflow Store
//!
//! Process-local [`WorkflowStore`] used by default and by the test suite.
//!
//! All state sits behind one `parking_lot::RwLock`. Critical sections never
//! await, so the lock is held only for the few map operations of a read or a
//! commit; commits validate every write before applying any of them.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::store::{ChangeSet, DocumentWrite, RoundSnapshot, StoreError, StoreResult, WorkflowStore};
use crate::models::{sort_for_timeline, Document, DocumentTransition, ValidatorId, WorkflowTask};
use crate::state_machine::TaskStatus;

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<Uuid, Document>,
    tasks: HashMap<Uuid, WorkflowTask>,
    tasks_by_document: HashMap<Uuid, Vec<Uuid>>,
    transitions: HashMap<Uuid, Vec<DocumentTransition>>,
}

impl MemoryState {
    fn document_tasks(&self, document_id: Uuid) -> Vec<WorkflowTask> {
        let mut tasks: Vec<WorkflowTask> = self
            .tasks_by_document
            .get(&document_id)
            .map(|ids| ids.iter().filter_map(|id| self.tasks.get(id).cloned()).collect())
            .unwrap_or_default();
        sort_for_timeline(&mut tasks);
        tasks
    }

    fn validate(&self, changes: &ChangeSet) -> StoreResult<()> {
        let mut written = HashSet::new();

        for write in &changes.documents {
            match write {
                DocumentWrite::Insert(document) => {
                    if self.documents.contains_key(&document.document_id) {
                        return Err(StoreError::DuplicateDocument(document.document_id));
                    }
                }
                DocumentWrite::Update {
                    document,
                    expected_version,
                } => {
                    let stored = self
                        .documents
                        .get(&document.document_id)
                        .ok_or(StoreError::MissingDocument(document.document_id))?;
                    if stored.lock_version != *expected_version {
                        return Err(StoreError::VersionConflict {
                            document_id: document.document_id,
                            expected: *expected_version,
                        });
                    }
                }
            }
            written.insert(write.document().document_id);
        }

        // One task per (document, round, validator)
        let mut seats = HashSet::new();
        for task in &changes.tasks {
            if !written.contains(&task.document_id) && !self.documents.contains_key(&task.document_id)
            {
                return Err(StoreError::MissingDocument(task.document_id));
            }
            let seat = (task.document_id, task.round, task.validator_id.clone());
            let taken_by_other = self
                .document_tasks(task.document_id)
                .iter()
                .any(|existing| {
                    existing.workflow_task_id != task.workflow_task_id
                        && existing.round == task.round
                        && existing.validator_id == task.validator_id
                });
            if taken_by_other || !seats.insert(seat) {
                return Err(StoreError::ConstraintViolation {
                    constraint: "workflow_tasks_document_round_validator_key".to_string(),
                });
            }
        }

        for transition in &changes.transitions {
            if !written.contains(&transition.document_id)
                && !self.documents.contains_key(&transition.document_id)
            {
                return Err(StoreError::MissingDocument(transition.document_id));
            }
        }

        Ok(())
    }

    fn apply(&mut self, changes: ChangeSet) {
        for write in changes.documents {
            let document = match write {
                DocumentWrite::Insert(document) | DocumentWrite::Update { document, .. } => document,
            };
            self.documents.insert(document.document_id, document);
        }

        for task in changes.tasks {
            let ids = self.tasks_by_document.entry(task.document_id).or_default();
            if !ids.contains(&task.workflow_task_id) {
                ids.push(task.workflow_task_id);
            }
            self.tasks.insert(task.workflow_task_id, task);
        }

        for transition in changes.transitions {
            let history = self.transitions.entry(transition.document_id).or_default();
            let sort_key = history.last().map(|t| t.sort_key + 1).unwrap_or(1);
            for previous in history.iter_mut() {
                previous.most_recent = false;
            }
            history.push(transition.into_transition(sort_key));
        }
    }
}

/// Thread-safe in-memory implementation of [`WorkflowStore`]
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    state: RwLock<MemoryState>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held (diagnostics)
    pub fn document_count(&self) -> usize {
        self.state.read().documents.len()
    }

    /// Number of tasks held across all rounds (diagnostics)
    pub fn task_count(&self) -> usize {
        self.state.read().tasks.len()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn find_document(&self, document_id: Uuid) -> StoreResult<Option<Document>> {
        Ok(self.state.read().documents.get(&document_id).cloned())
    }

    async fn find_task(&self, workflow_task_id: Uuid) -> StoreResult<Option<WorkflowTask>> {
        Ok(self.state.read().tasks.get(&workflow_task_id).cloned())
    }

    async fn load_round_snapshot(&self, document_id: Uuid) -> StoreResult<Option<RoundSnapshot>> {
        let state = self.state.read();
        let Some(document) = state.documents.get(&document_id).cloned() else {
            return Ok(None);
        };
        let tasks = state
            .document_tasks(document_id)
            .into_iter()
            .filter(|task| task.round == document.current_round)
            .collect();
        Ok(Some(RoundSnapshot { document, tasks }))
    }

    async fn tasks_for_document(&self, document_id: Uuid) -> StoreResult<Vec<WorkflowTask>> {
        Ok(self.state.read().document_tasks(document_id))
    }

    async fn tasks_for_validator(
        &self,
        validator_id: &ValidatorId,
        status: Option<TaskStatus>,
    ) -> StoreResult<Vec<WorkflowTask>> {
        let state = self.state.read();
        let mut tasks: Vec<WorkflowTask> = state
            .tasks
            .values()
            .filter(|task| &task.validator_id == validator_id)
            .filter(|task| status.map_or(true, |wanted| task.status == wanted))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.assigned_at, task.workflow_task_id));
        Ok(tasks)
    }

    async fn overdue_candidates(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<WorkflowTask>> {
        let guard = self.state.read();
        let state: &MemoryState = &guard;
        let mut tasks: Vec<WorkflowTask> = state
            .documents
            .values()
            .filter(|document| document.status.is_in_flight())
            .flat_map(move |document| {
                state
                    .tasks_by_document
                    .get(&document.document_id)
                    .into_iter()
                    .flatten()
                    .filter_map(move |id| state.tasks.get(id))
                    .filter(move |task| task.round == document.current_round)
            })
            .filter(|task| task.is_pending() && task.assigned_at < cutoff)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.assigned_at, task.workflow_task_id));
        Ok(tasks)
    }

    async fn transitions_for_document(
        &self,
        document_id: Uuid,
    ) -> StoreResult<Vec<DocumentTransition>> {
        Ok(self
            .state
            .read()
            .transitions
            .get(&document_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        let mut state = self.state.write();
        state.validate(&changes)?;
        state.apply(changes);
        Ok(())
    }
}
