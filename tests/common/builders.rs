//! Builders for engines and documents used across the integration tests

use std::sync::Arc;
use std::time::Duration;

use docflow_core::config::ChildRejectionPolicy;
use docflow_core::database::{MemoryWorkflowStore, WorkflowStore};
use docflow_core::models::{Document, NewDocument, ValidatorId, WorkflowTask};
use docflow_core::notifications::NotificationHook;
use docflow_core::orchestration::{ConflictRetryPolicy, WorkflowEngine};

use super::RecordingNotifier;

pub fn validators(ids: &[&str]) -> Vec<ValidatorId> {
    ids.iter().map(|id| ValidatorId::from(*id)).collect()
}

/// Builder pattern for test engines
pub struct TestEngineBuilder {
    store: Arc<dyn WorkflowStore>,
    notifier: Arc<dyn NotificationHook>,
    policy: ChildRejectionPolicy,
    retry: Option<ConflictRetryPolicy>,
    notification_timeout: Option<Duration>,
}

impl TestEngineBuilder {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryWorkflowStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            policy: ChildRejectionPolicy::RemainPaused,
            retry: None,
            notification_timeout: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn WorkflowStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationHook>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_policy(mut self, policy: ChildRejectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: ConflictRetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_notification_timeout(mut self, timeout: Duration) -> Self {
        self.notification_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> WorkflowEngine {
        let mut builder = WorkflowEngine::builder(self.store)
            .notifier(self.notifier)
            .child_rejection_policy(self.policy);
        if let Some(retry) = self.retry {
            builder = builder.retry_policy(retry);
        }
        if let Some(timeout) = self.notification_timeout {
            builder = builder.notification_timeout(timeout);
        }
        builder.build()
    }
}

impl Default for TestEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Register a document and open its first round
pub async fn submitted_document(
    engine: &WorkflowEngine,
    title: &str,
    validator_ids: &[&str],
) -> (Document, Vec<WorkflowTask>) {
    let document = engine
        .register_document(NewDocument::new(title, "Juridique"))
        .await
        .expect("Failed to register test document");
    let tasks = engine
        .submit_for_validation(document.document_id, validators(validator_ids))
        .await
        .expect("Failed to submit test document");
    (document, tasks)
}
