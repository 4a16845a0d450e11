//! # Notification Hook
//!
//! Outbound interface telling validators about work. The transport (push,
//! e-mail, in-app feed) lives outside the core; the engine calls these hooks
//! after a commit and only logs their failures.
//!
//! Hooks are driven through a [`NotificationDispatcher`], which delivers a
//! batch concurrently and gives up on any call that outlives its timeout. A
//! stuck transport costs the caller at most one timeout per batch.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::events;
use crate::events::{EventPublisher, WorkflowEvent};
use crate::models::WorkflowTask;

/// Error reported by a notification transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Notification transport unavailable: {0}")]
    Unavailable(String),
    #[error("Notification rejected for validator {validator_id}: {reason}")]
    Rejected { validator_id: String, reason: String },
}

pub type NotificationResult = Result<(), NotificationError>;

/// Fire-and-forget notifications about validator tasks
#[async_trait]
pub trait NotificationHook: Send + Sync + fmt::Debug {
    /// A task was created for a validator
    async fn on_task_assigned(&self, task: &WorkflowTask) -> NotificationResult;

    /// A paused task became actionable again after its dependency resolved
    async fn on_task_reactivated(&self, task: &WorkflowTask) -> NotificationResult;

    /// A task has been pending longer than the configured SLA
    async fn on_task_overdue(&self, _task: &WorkflowTask) -> NotificationResult {
        Ok(())
    }
}

/// Notifier that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationHook for NoopNotifier {
    async fn on_task_assigned(&self, _task: &WorkflowTask) -> NotificationResult {
        Ok(())
    }

    async fn on_task_reactivated(&self, _task: &WorkflowTask) -> NotificationResult {
        Ok(())
    }
}

/// Notifier that writes each notification as a structured log record
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl NotificationHook for LoggingNotifier {
    async fn on_task_assigned(&self, task: &WorkflowTask) -> NotificationResult {
        info!(
            workflow_task_id = %task.workflow_task_id,
            document_id = %task.document_id,
            validator_id = %task.validator_id,
            round = task.round,
            step = task.step,
            "NOTIFY: task assigned"
        );
        Ok(())
    }

    async fn on_task_reactivated(&self, task: &WorkflowTask) -> NotificationResult {
        info!(
            workflow_task_id = %task.workflow_task_id,
            document_id = %task.document_id,
            validator_id = %task.validator_id,
            "NOTIFY: task reactivated"
        );
        Ok(())
    }

    async fn on_task_overdue(&self, task: &WorkflowTask) -> NotificationResult {
        warn!(
            workflow_task_id = %task.workflow_task_id,
            document_id = %task.document_id,
            validator_id = %task.validator_id,
            assigned_at = %task.assigned_at,
            "NOTIFY: task overdue"
        );
        Ok(())
    }
}

/// Notifier that republishes notifications on an [`EventPublisher`]
///
/// Lets an in-process transport subscribe to `notification.*` events instead
/// of implementing [`NotificationHook`] itself.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    publisher: EventPublisher,
}

impl BroadcastNotifier {
    pub fn new(publisher: EventPublisher) -> Self {
        Self { publisher }
    }

    fn forward(&self, name: &str, task: &WorkflowTask) -> NotificationResult {
        self.publisher
            .publish(WorkflowEvent::for_task(name, task))
            .map_err(|e| NotificationError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl NotificationHook for BroadcastNotifier {
    async fn on_task_assigned(&self, task: &WorkflowTask) -> NotificationResult {
        self.forward(events::NOTIFICATION_TASK_ASSIGNED, task)
    }

    async fn on_task_reactivated(&self, task: &WorkflowTask) -> NotificationResult {
        self.forward(events::NOTIFICATION_TASK_REACTIVATED, task)
    }

    async fn on_task_overdue(&self, task: &WorkflowTask) -> NotificationResult {
        self.forward(events::NOTIFICATION_TASK_OVERDUE, task)
    }
}

/// Which hook a delivery targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotificationKind {
    Assigned,
    Reactivated,
    Overdue,
}

impl NotificationKind {
    fn hook_name(self) -> &'static str {
        match self {
            Self::Assigned => "on_task_assigned",
            Self::Reactivated => "on_task_reactivated",
            Self::Overdue => "on_task_overdue",
        }
    }
}

/// Bounded, failure-tolerant delivery of [`NotificationHook`] calls
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    hook: Arc<dyn NotificationHook>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(hook: Arc<dyn NotificationHook>, timeout: Duration) -> Self {
        Self { hook, timeout }
    }

    /// Returns how many deliveries succeeded
    pub async fn task_assigned(&self, tasks: &[WorkflowTask]) -> usize {
        self.deliver_all(NotificationKind::Assigned, tasks).await
    }

    pub async fn task_reactivated(&self, task: &WorkflowTask) -> bool {
        self.deliver_all(NotificationKind::Reactivated, std::slice::from_ref(task))
            .await
            == 1
    }

    pub async fn task_overdue(&self, tasks: &[WorkflowTask]) -> usize {
        self.deliver_all(NotificationKind::Overdue, tasks).await
    }

    async fn deliver_all(&self, kind: NotificationKind, tasks: &[WorkflowTask]) -> usize {
        if tasks.is_empty() {
            return 0;
        }
        let deliveries = tasks.iter().map(|task| {
            let call = match kind {
                NotificationKind::Assigned => self.hook.on_task_assigned(task),
                NotificationKind::Reactivated => self.hook.on_task_reactivated(task),
                NotificationKind::Overdue => self.hook.on_task_overdue(task),
            };
            self.deliver(kind, task, call)
        });
        join_all(deliveries)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count()
    }

    async fn deliver<F>(&self, kind: NotificationKind, task: &WorkflowTask, call: F) -> bool
    where
        F: Future<Output = NotificationResult>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(())) => {
                debug!(hook = kind.hook_name(), workflow_task_id = %task.workflow_task_id, "Notification delivered");
                true
            }
            Ok(Err(e)) => {
                warn!(
                    hook = kind.hook_name(),
                    workflow_task_id = %task.workflow_task_id,
                    error = %e,
                    "Notification failed"
                );
                false
            }
            Err(_) => {
                warn!(
                    hook = kind.hook_name(),
                    workflow_task_id = %task.workflow_task_id,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Notification timed out"
                );
                false
            }
        }
    }
}
