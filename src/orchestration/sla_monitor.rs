//! # SLA Monitor
//!
//! Periodic sweep reporting pending tasks older than the configured timeout.
//! Overdue tasks are only reported: nothing is auto-approved or reassigned.
//! Tasks of paused documents are skipped since their validator is waiting on
//! a dependent document; so are tasks left pending by a superseded round.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::constants::events;
use crate::database::WorkflowStore;
use crate::error::WorkflowResult;
use crate::events::{EventPublisher, WorkflowEvent};
use crate::models::WorkflowTask;
use crate::notifications::NotificationDispatcher;

pub struct SlaMonitor {
    store: Arc<dyn WorkflowStore>,
    notifications: NotificationDispatcher,
    publisher: EventPublisher,
    timeout: chrono::Duration,
    shutdown_notify: Arc<Notify>,
}

impl std::fmt::Debug for SlaMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlaMonitor")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SlaMonitor {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        notifications: NotificationDispatcher,
        publisher: EventPublisher,
        timeout: chrono::Duration,
    ) -> Self {
        Self {
            store,
            notifications,
            publisher,
            timeout,
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    pub fn timeout(&self) -> chrono::Duration {
        self.timeout
    }

    /// Report every actionable task assigned before `now - timeout`
    ///
    /// Returns the overdue tasks, oldest first.
    pub async fn sweep(&self, now: DateTime<Utc>) -> WorkflowResult<Vec<WorkflowTask>> {
        let cutoff = now - self.timeout;
        let overdue = self.store.overdue_candidates(cutoff).await?;

        for task in &overdue {
            let waiting = task.waiting_for(now);
            self.publisher
                .publish(
                    WorkflowEvent::for_task(events::TASK_OVERDUE, task)
                        .with_field("overdue_seconds", waiting.num_seconds()),
                )
                .unwrap_or_else(|e| warn!(error = %e, "Failed to publish overdue event"));
        }
        self.notifications.task_overdue(&overdue).await;

        if overdue.is_empty() {
            debug!(cutoff = %cutoff, "SLA sweep found no overdue tasks");
        } else {
            info!(count = overdue.len(), cutoff = %cutoff, "SLA sweep reported overdue tasks");
        }
        Ok(overdue)
    }

    /// Spawn the sweep loop; stops on [`SlaMonitor::shutdown`]
    pub fn start(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let shutdown_notify = self.shutdown_notify.clone();
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "SLA monitor started");
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = self.sweep(Utc::now()).await {
                            error!("SLA sweep failed: {}", e);
                        }
                    }
                    _ = shutdown_notify.notified() => {
                        info!("SLA monitor shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the sweep loop
    ///
    /// A shutdown signalled before the loop starts waiting is not lost.
    pub fn shutdown(&self) {
        self.shutdown_notify.notify_one();
    }
}
