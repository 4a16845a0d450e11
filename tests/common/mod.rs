//! Shared test infrastructure: engine builders, recording notifiers and a
//! store wrapper that injects optimistic-lock conflicts.

#![allow(dead_code)]

pub mod builders;
pub mod strategies;

pub use builders::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docflow_core::database::{
    ChangeSet, MemoryWorkflowStore, RoundSnapshot, StoreError, StoreResult, WorkflowStore,
};
use docflow_core::models::{Document, DocumentTransition, ValidatorId, WorkflowTask};
use docflow_core::notifications::{NotificationError, NotificationHook, NotificationResult};
use docflow_core::TaskStatus;
use parking_lot::Mutex;
use uuid::Uuid;

/// Which hook fired, and for which task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Assigned(Uuid),
    Reactivated(Uuid),
    Overdue(Uuid),
}

/// Notifier remembering every call
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<Notification> {
        self.calls.lock().clone()
    }

    pub fn reactivated(&self) -> Vec<Uuid> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Notification::Reactivated(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn assigned_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Notification::Assigned(_)))
            .count()
    }
}

#[async_trait]
impl NotificationHook for RecordingNotifier {
    async fn on_task_assigned(&self, task: &WorkflowTask) -> NotificationResult {
        self.calls
            .lock()
            .push(Notification::Assigned(task.workflow_task_id));
        Ok(())
    }

    async fn on_task_reactivated(&self, task: &WorkflowTask) -> NotificationResult {
        self.calls
            .lock()
            .push(Notification::Reactivated(task.workflow_task_id));
        Ok(())
    }

    async fn on_task_overdue(&self, task: &WorkflowTask) -> NotificationResult {
        self.calls
            .lock()
            .push(Notification::Overdue(task.workflow_task_id));
        Ok(())
    }
}

/// Notifier whose every call fails
#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl NotificationHook for FailingNotifier {
    async fn on_task_assigned(&self, _task: &WorkflowTask) -> NotificationResult {
        Err(NotificationError::Unavailable("mail relay down".into()))
    }

    async fn on_task_reactivated(&self, _task: &WorkflowTask) -> NotificationResult {
        Err(NotificationError::Unavailable("mail relay down".into()))
    }
}

/// Notifier whose calls never complete
#[derive(Debug, Default)]
pub struct HangingNotifier;

#[async_trait]
impl NotificationHook for HangingNotifier {
    async fn on_task_assigned(&self, _task: &WorkflowTask) -> NotificationResult {
        std::future::pending().await
    }

    async fn on_task_reactivated(&self, _task: &WorkflowTask) -> NotificationResult {
        std::future::pending().await
    }

    async fn on_task_overdue(&self, _task: &WorkflowTask) -> NotificationResult {
        std::future::pending().await
    }
}

/// Memory store that fails the next `n` commits with a version conflict
#[derive(Debug, Default)]
pub struct ConflictInjectingStore {
    inner: MemoryWorkflowStore,
    conflicts_left: AtomicUsize,
    commits: AtomicUsize,
}

impl ConflictInjectingStore {
    pub fn failing(conflicts: usize) -> Self {
        Self {
            inner: MemoryWorkflowStore::new(),
            conflicts_left: AtomicUsize::new(conflicts),
            commits: AtomicUsize::new(0),
        }
    }

    pub fn arm(&self, conflicts: usize) {
        self.conflicts_left.store(conflicts, Ordering::SeqCst);
    }

    /// Commit attempts, including the rejected ones
    pub fn commit_attempts(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowStore for ConflictInjectingStore {
    async fn find_document(&self, document_id: Uuid) -> StoreResult<Option<Document>> {
        self.inner.find_document(document_id).await
    }

    async fn find_task(&self, workflow_task_id: Uuid) -> StoreResult<Option<WorkflowTask>> {
        self.inner.find_task(workflow_task_id).await
    }

    async fn load_round_snapshot(&self, document_id: Uuid) -> StoreResult<Option<RoundSnapshot>> {
        self.inner.load_round_snapshot(document_id).await
    }

    async fn tasks_for_document(&self, document_id: Uuid) -> StoreResult<Vec<WorkflowTask>> {
        self.inner.tasks_for_document(document_id).await
    }

    async fn tasks_for_validator(
        &self,
        validator_id: &ValidatorId,
        status: Option<TaskStatus>,
    ) -> StoreResult<Vec<WorkflowTask>> {
        self.inner.tasks_for_validator(validator_id, status).await
    }

    async fn overdue_candidates(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<WorkflowTask>> {
        self.inner.overdue_candidates(cutoff).await
    }

    async fn transitions_for_document(
        &self,
        document_id: Uuid,
    ) -> StoreResult<Vec<DocumentTransition>> {
        self.inner.transitions_for_document(document_id).await
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            let document = changes
                .documents
                .first()
                .map(|write| write.document().clone());
            if let Some(document) = document {
                return Err(StoreError::VersionConflict {
                    document_id: document.document_id,
                    expected: document.lock_version - 1,
                });
            }
        }
        self.inner.commit(changes).await
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
