//! # Workflow Engine
//!
//! Entry point for every workflow operation: registering documents, opening
//! validation rounds, recording decisions, spawning and resolving dependent
//! documents, and the read-side queries.
//!
//! ## Execution model
//!
//! Each mutating operation:
//!
//! 1. takes the document's lock from the [`DocumentLockRegistry`]
//! 2. reads a fresh snapshot, plans the change and commits one [`ChangeSet`],
//!    retrying the read-plan-commit cycle on `lock_version` conflicts
//! 3. releases the lock, then notifies validators and publishes lifecycle
//!    events
//!
//! Notification hooks run under the `notifications.timeout_ms` bound, so a
//! stalled transport delays an operation by at most that timeout and never
//! fails it.
//!
//! When a committed change leaves a linked child document terminal, the
//! engine resolves the parent afterwards under the parent's own lock. Locks
//! are never nested.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{ChildRejectionPolicy, DocflowConfig, SlaConfig, StorageConfig};
use crate::constants::{self, events};
use crate::database::{ChangeSet, MemoryWorkflowStore, RoundSnapshot, WorkflowStore};
use crate::error::{WorkflowError, WorkflowResult};
use crate::events::{EventPublisher, WorkflowEvent};
use crate::logging::{log_document_operation, log_error, log_task_operation};
use crate::models::{Document, DocumentTransition, NewDocument, ValidatorId, WorkflowTask};
use crate::notifications::{NoopNotifier, NotificationDispatcher, NotificationHook};
use crate::orchestration::aggregation::{AggregationEngine, RoundSummary};
use crate::orchestration::dependency_orchestrator::{
    DependencyOrchestrator, DependencyResolution, ResolutionKind,
};
use crate::orchestration::document_locks::DocumentLockRegistry;
use crate::orchestration::retry::ConflictRetryPolicy;
use crate::orchestration::sla_monitor::SlaMonitor;
use crate::orchestration::task_assignment::TaskAssignment;
use crate::state_machine::guards::{AcceptsDecisionsGuard, PendingTaskGuard, StateGuard};
use crate::state_machine::{
    DocumentEvent, DocumentStateMachine, DocumentStatus, TaskEvent, TaskStateMachine, TaskStatus,
};
use crate::validation::{
    ensure_validators_known, validate_document_draft, validate_validator_set, AllowAllDirectory,
    ValidatorDirectory,
};

/// A validator's verdict on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    fn into_event(self, comment: Option<String>) -> TaskEvent {
        match self {
            Self::Approved => TaskEvent::Approve(comment),
            Self::Rejected => TaskEvent::Reject(comment),
        }
    }
}

impl FromStr for Decision {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(WorkflowError::InvalidState(format!(
                "Unknown decision '{other}', expected approved or rejected"
            ))),
        }
    }
}

impl From<Decision> for TaskStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => TaskStatus::Approved,
            Decision::Rejected => TaskStatus::Rejected,
        }
    }
}

/// Result of a recorded decision
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub task: WorkflowTask,
    /// Document after aggregation
    pub document: Document,
    pub previous_status: DocumentStatus,
}

impl DecisionOutcome {
    pub fn status_changed(&self) -> bool {
        self.document.status != self.previous_status
    }
}

/// Document validation workflow engine
pub struct WorkflowEngine {
    store: Arc<dyn WorkflowStore>,
    locks: DocumentLockRegistry,
    notifications: NotificationDispatcher,
    directory: Arc<dyn ValidatorDirectory>,
    publisher: EventPublisher,
    retry: ConflictRetryPolicy,
    child_rejection_policy: ChildRejectionPolicy,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("store", &self.store)
            .field("notifications", &self.notifications)
            .field("directory", &self.directory)
            .field("retry", &self.retry)
            .field("child_rejection_policy", &self.child_rejection_policy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`WorkflowEngine`]
pub struct WorkflowEngineBuilder {
    store: Arc<dyn WorkflowStore>,
    notifier: Arc<dyn NotificationHook>,
    notification_timeout: std::time::Duration,
    directory: Arc<dyn ValidatorDirectory>,
    publisher: Option<EventPublisher>,
    channel_capacity: usize,
    retry: ConflictRetryPolicy,
    child_rejection_policy: ChildRejectionPolicy,
}

impl WorkflowEngineBuilder {
    fn new(store: Arc<dyn WorkflowStore>) -> Self {
        let defaults = DocflowConfig::default();
        Self {
            store,
            notifier: Arc::new(NoopNotifier),
            notification_timeout: defaults.notifications.timeout(),
            directory: Arc::new(AllowAllDirectory),
            publisher: None,
            channel_capacity: defaults.events.channel_capacity,
            retry: ConflictRetryPolicy::from_config(&defaults.engine),
            child_rejection_policy: defaults.dependency.child_rejection_policy,
        }
    }

    /// Apply the engine, dependency, events and notifications sections of a
    /// configuration
    pub fn with_config(mut self, config: &DocflowConfig) -> Self {
        self.retry = ConflictRetryPolicy::from_config(&config.engine);
        self.notification_timeout = config.notifications.timeout();
        self.child_rejection_policy = config.dependency.child_rejection_policy;
        self.channel_capacity = config.events.channel_capacity;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotificationHook>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Upper bound on each notification hook call
    pub fn notification_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.notification_timeout = timeout;
        self
    }

    pub fn validator_directory(mut self, directory: Arc<dyn ValidatorDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Share an existing publisher instead of creating one
    pub fn event_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn retry_policy(mut self, retry: ConflictRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn child_rejection_policy(mut self, policy: ChildRejectionPolicy) -> Self {
        self.child_rejection_policy = policy;
        self
    }

    pub fn build(self) -> WorkflowEngine {
        WorkflowEngine {
            store: self.store,
            locks: DocumentLockRegistry::new(),
            notifications: NotificationDispatcher::new(self.notifier, self.notification_timeout),
            directory: self.directory,
            publisher: self
                .publisher
                .unwrap_or_else(|| EventPublisher::new(self.channel_capacity)),
            retry: self.retry,
            child_rejection_policy: self.child_rejection_policy,
        }
    }
}

impl WorkflowEngine {
    pub fn builder(store: Arc<dyn WorkflowStore>) -> WorkflowEngineBuilder {
        WorkflowEngineBuilder::new(store)
    }

    /// Engine over a fresh in-memory store with default settings
    pub fn in_memory() -> Self {
        Self::builder(Arc::new(MemoryWorkflowStore::new())).build()
    }

    /// Builder with the store selected by `config.storage` and the rest of the
    /// configuration applied
    pub async fn from_config(config: &DocflowConfig) -> WorkflowResult<WorkflowEngineBuilder> {
        config.validate()?;
        let store: Arc<dyn WorkflowStore> = match &config.storage {
            StorageConfig::Memory => Arc::new(MemoryWorkflowStore::new()),
            #[cfg(feature = "postgres")]
            StorageConfig::Postgres {
                url,
                max_connections,
            } => Arc::new(crate::database::PgWorkflowStore::connect(url, *max_connections).await?),
            #[cfg(not(feature = "postgres"))]
            StorageConfig::Postgres { .. } => {
                return Err(WorkflowError::Configuration(
                    "postgres storage requires the `postgres` feature".to_string(),
                ))
            }
        };
        info!(storage = config.storage.kind(), "Workflow store ready");
        Ok(Self::builder(store).with_config(config))
    }

    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<WorkflowEvent> {
        self.publisher.subscribe()
    }

    pub fn child_rejection_policy(&self) -> ChildRejectionPolicy {
        self.child_rejection_policy
    }

    /// Documents with an operation running or queued in this process
    pub fn active_document_locks(&self) -> usize {
        self.locks.len()
    }

    /// SLA monitor sharing this engine's store, notifier and publisher
    pub fn sla_monitor(&self, timeout: chrono::Duration) -> SlaMonitor {
        SlaMonitor::new(
            self.store.clone(),
            self.notifications.clone(),
            self.publisher.clone(),
            timeout,
        )
    }

    /// Spawn the SLA sweep described by `config`; `None` when disabled
    pub fn start_sla_monitor(
        &self,
        config: &SlaConfig,
    ) -> Option<(Arc<SlaMonitor>, tokio::task::JoinHandle<()>)> {
        if !config.enabled {
            debug!("SLA monitor disabled");
            return None;
        }
        let monitor = Arc::new(self.sla_monitor(config.timeout()));
        let handle = monitor.clone().start(config.sweep_interval());
        Some((monitor, handle))
    }

    // ------------------------------------------------------------------
    // Document registration and submission
    // ------------------------------------------------------------------

    /// Create a `draft` document
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn register_document(&self, draft: NewDocument) -> WorkflowResult<Document> {
        validate_document_draft(&draft)?;

        let document = Document::from_draft(draft, Utc::now());
        let mut changes = ChangeSet::new();
        changes
            .insert_document(document.clone())
            .record_transition(Some(DocumentStateMachine::initial_transition(&document)));
        self.store.commit(changes).await?;

        log_document_operation(
            "register",
            document.document_id,
            document.status.as_str(),
            None,
            None,
        );
        self.emit(WorkflowEvent::for_document(
            events::DOCUMENT_REGISTERED,
            &document,
        ));
        Ok(document)
    }

    /// Open a validation round with one task per validator, in order
    #[instrument(skip(self, validators), fields(validators = validators.len()))]
    pub async fn submit_for_validation(
        &self,
        document_id: Uuid,
        validators: Vec<ValidatorId>,
    ) -> WorkflowResult<Vec<WorkflowTask>> {
        validate_validator_set(&validators)?;
        ensure_validators_known(self.directory.as_ref(), &validators).await?;

        let (document, tasks, previous_status) = {
            let _guard = self.locks.acquire(document_id).await;
            self.retry
                .run("submit_for_validation", || {
                    self.try_submit(document_id, &validators)
                })
                .await?
        };

        log_document_operation(
            "submit",
            document_id,
            document.status.as_str(),
            Some(document.current_round),
            None,
        );
        self.emit_status_change(&document, previous_status);
        for task in &tasks {
            self.emit(WorkflowEvent::for_task(events::TASK_ASSIGNED, task).with_field("step", task.step));
        }
        self.notifications.task_assigned(&tasks).await;
        Ok(tasks)
    }

    async fn try_submit(
        &self,
        document_id: Uuid,
        validators: &[ValidatorId],
    ) -> WorkflowResult<(Document, Vec<WorkflowTask>, DocumentStatus)> {
        let document = self.load_document(document_id).await?;
        let previous_status = document.status;
        let plan = TaskAssignment::plan_round(&document, validators, Utc::now())?;
        self.store.commit(plan.changes).await?;
        Ok((plan.document, plan.tasks, previous_status))
    }

    // ------------------------------------------------------------------
    // Decisions and aggregation
    // ------------------------------------------------------------------

    /// Record a validator's decision, then re-aggregate the document
    #[instrument(skip(self, decision, comment), fields(decision = decision.as_str()))]
    pub async fn decide(
        &self,
        workflow_task_id: Uuid,
        decision: Decision,
        comment: Option<String>,
    ) -> WorkflowResult<DecisionOutcome> {
        let document_id = self.load_task(workflow_task_id).await?.document_id;
        let event = decision.into_event(comment);

        let outcome = {
            let _guard = self.locks.acquire(document_id).await;
            self.retry
                .run("decide", || self.try_decide(document_id, workflow_task_id, &event))
                .await?
        };

        log_task_operation(
            "decide",
            workflow_task_id,
            document_id,
            outcome.task.validator_id.as_str(),
            outcome.task.status.as_str(),
            outcome.task.comment.as_deref(),
        );
        self.emit(
            WorkflowEvent::for_task(events::TASK_DECIDED, &outcome.task)
                .with_field("document_status", outcome.document.status.as_str()),
        );
        self.emit_status_change(&outcome.document, outcome.previous_status);
        self.after_terminal(&outcome.document, outcome.previous_status)
            .await;

        Ok(outcome)
    }

    async fn try_decide(
        &self,
        document_id: Uuid,
        workflow_task_id: Uuid,
        event: &TaskEvent,
    ) -> WorkflowResult<DecisionOutcome> {
        let RoundSnapshot {
            mut document,
            mut tasks,
        } = self.load_snapshot(document_id).await?;
        AcceptsDecisionsGuard.check(&document)?;

        let round = document.current_round;
        let Some(task) = tasks
            .iter_mut()
            .find(|task| task.workflow_task_id == workflow_task_id)
        else {
            return Err(WorkflowError::InvalidState(format!(
                "Task {workflow_task_id} is not part of round {round} of document {document_id}"
            )));
        };
        PendingTaskGuard.check(task)?;

        let now = Utc::now();
        TaskStateMachine::apply(task, event, now)?;
        let task = task.clone();

        let previous_status = document.status;
        let transition = AggregationEngine::evaluate(&mut document, &tasks, now)?;

        // Always write the document so concurrent decisions collide on its version
        let mut changes = ChangeSet::new();
        changes
            .update_document(document.clone())
            .record_transition(transition)
            .upsert_task(task.clone());
        self.store.commit(changes).await?;
        document.lock_version += 1;

        Ok(DecisionOutcome {
            task,
            document,
            previous_status,
        })
    }

    /// Re-run aggregation for a document and return its status
    ///
    /// Idempotent: commits nothing when the status would not change.
    #[instrument(skip(self))]
    pub async fn recompute(&self, document_id: Uuid) -> WorkflowResult<DocumentStatus> {
        let (document, previous_status) = {
            let _guard = self.locks.acquire(document_id).await;
            self.retry
                .run("recompute", || self.try_recompute(document_id))
                .await?
        };

        self.emit_status_change(&document, previous_status);
        self.after_terminal(&document, previous_status).await;
        Ok(document.status)
    }

    async fn try_recompute(&self, document_id: Uuid) -> WorkflowResult<(Document, DocumentStatus)> {
        let RoundSnapshot {
            mut document,
            tasks,
        } = self.load_snapshot(document_id).await?;
        let previous_status = document.status;

        let Some(transition) = AggregationEngine::evaluate(&mut document, &tasks, Utc::now())?
        else {
            return Ok((document, previous_status));
        };

        let mut changes = ChangeSet::new();
        changes
            .update_document(document.clone())
            .record_transition(Some(transition));
        self.store.commit(changes).await?;
        document.lock_version += 1;
        Ok((document, previous_status))
    }

    /// Flag an in-flight document as actively being worked on
    #[instrument(skip(self))]
    pub async fn mark_in_progress(&self, document_id: Uuid) -> WorkflowResult<Document> {
        self.apply_document_event(document_id, "mark_in_progress", DocumentEvent::MarkInProgress)
            .await
    }

    /// Remove the in-progress marker
    #[instrument(skip(self))]
    pub async fn release_in_progress(&self, document_id: Uuid) -> WorkflowResult<Document> {
        self.apply_document_event(document_id, "release_in_progress", DocumentEvent::Release)
            .await
    }

    async fn apply_document_event(
        &self,
        document_id: Uuid,
        operation: &str,
        event: DocumentEvent,
    ) -> WorkflowResult<Document> {
        let event = &event;
        let (document, previous_status) = {
            let _guard = self.locks.acquire(document_id).await;
            self.retry
                .run(operation, || async move {
                    let mut document = self.load_document(document_id).await?;
                    let previous_status = document.status;
                    let transition = DocumentStateMachine::apply(&mut document, event, Utc::now())?;

                    let mut changes = ChangeSet::new();
                    changes
                        .update_document(document.clone())
                        .record_transition(transition);
                    self.store.commit(changes).await?;
                    document.lock_version += 1;
                    Ok::<_, WorkflowError>((document, previous_status))
                })
                .await?
        };

        log_document_operation(operation, document_id, document.status.as_str(), None, None);
        self.emit_status_change(&document, previous_status);
        Ok(document)
    }

    // ------------------------------------------------------------------
    // Dependent documents
    // ------------------------------------------------------------------

    /// Pause the task's document on a new child document
    ///
    /// Returns the child in `draft`; it follows the ordinary submission flow.
    #[instrument(skip(self, child_draft), fields(child_title = %child_draft.title))]
    pub async fn initiate_linked_document(
        &self,
        workflow_task_id: Uuid,
        child_draft: NewDocument,
    ) -> WorkflowResult<Document> {
        validate_document_draft(&child_draft)?;
        let parent_id = self.load_task(workflow_task_id).await?.document_id;

        let child_draft = &child_draft;
        let plan = {
            let _guard = self.locks.acquire(parent_id).await;
            self.retry
                .run("initiate_linked_document", || async move {
                    let snapshot = self.load_snapshot(parent_id).await?;
                    let task = match snapshot
                        .tasks
                        .iter()
                        .find(|task| task.workflow_task_id == workflow_task_id)
                    {
                        Some(task) => task.clone(),
                        // Older round: let the round guard explain the refusal
                        None => self.load_task(workflow_task_id).await?,
                    };
                    let plan = DependencyOrchestrator::plan_initiation(
                        &snapshot.document,
                        &task,
                        child_draft.clone(),
                        Utc::now(),
                    )?;
                    self.store.commit(plan.changes.clone()).await?;
                    Ok::<_, WorkflowError>(plan)
                })
                .await?
        };

        log_document_operation(
            "initiate_dependency",
            parent_id,
            plan.parent.status.as_str(),
            Some(plan.parent.current_round),
            Some(&format!("child {}", plan.child.document_id)),
        );
        self.emit(WorkflowEvent::for_document(
            events::DOCUMENT_REGISTERED,
            &plan.child,
        ));
        self.emit(
            WorkflowEvent::for_document(events::DEPENDENCY_SPAWNED, &plan.parent)
                .with_field("child_document_id", plan.child.document_id.to_string())
                .with_field("workflow_task_id", plan.task.workflow_task_id.to_string()),
        );
        Ok(plan.child)
    }

    /// Apply a terminal child's outcome to its paused parent
    ///
    /// Runs automatically after the child's terminal transition; exposed so an
    /// interrupted resolution can be replayed. Returns the parent when it was
    /// changed, `None` when there was nothing to do.
    #[instrument(skip(self))]
    pub async fn reconcile_dependency(
        &self,
        child_document_id: Uuid,
    ) -> WorkflowResult<Option<Document>> {
        let child = self.load_document(child_document_id).await?;
        let Some(parent_id) = child.linked_document_id else {
            return Ok(None);
        };
        if !child.status.is_terminal() {
            debug!(child_id = %child_document_id, status = %child.status, "Child not terminal yet");
            return Ok(None);
        }

        let resolution = {
            let _guard = self.locks.acquire(parent_id).await;
            self.retry
                .run("reconcile_dependency", || {
                    self.try_resolve(parent_id, child_document_id)
                })
                .await?
        };
        let Some(resolution) = resolution else {
            return Ok(None);
        };

        self.after_resolution(&resolution, child_document_id).await;
        Ok(Some(resolution.parent))
    }

    async fn try_resolve(
        &self,
        parent_id: Uuid,
        child_document_id: Uuid,
    ) -> WorkflowResult<Option<DependencyResolution>> {
        let child = self.load_document(child_document_id).await?;
        let snapshot = self.load_snapshot(parent_id).await?;

        let Some(resolution) = DependencyOrchestrator::plan_resolution(
            &snapshot.document,
            &snapshot.tasks,
            &child,
            self.child_rejection_policy,
            Utc::now(),
        )?
        else {
            return Ok(None);
        };

        self.store.commit(resolution.changes.clone()).await?;
        Ok(Some(resolution))
    }

    async fn after_resolution(&self, resolution: &DependencyResolution, child_document_id: Uuid) {
        let parent = &resolution.parent;
        let name = match resolution.kind {
            ResolutionKind::Resumed => events::DEPENDENCY_RESOLVED,
            ResolutionKind::RejectedByChild => events::DEPENDENCY_CHILD_REJECTED,
        };
        log_document_operation(
            "resolve_dependency",
            parent.document_id,
            parent.status.as_str(),
            Some(parent.current_round),
            Some(name),
        );
        self.emit(
            WorkflowEvent::for_document(name, parent)
                .with_field("child_document_id", child_document_id.to_string()),
        );
        if parent.status.is_terminal() {
            self.emit_status_change(parent, DocumentStatus::PendingValidation);
        }

        if let (ResolutionKind::Resumed, Some(task)) = (resolution.kind, &resolution.task) {
            self.emit(WorkflowEvent::for_task(events::TASK_REACTIVATED, task));
            self.notifications.task_reactivated(task).await;
        }
    }

    /// Resolve the parent once a linked child reaches a terminal state
    async fn after_terminal(&self, document: &Document, previous_status: DocumentStatus) {
        if previous_status.is_terminal()
            || !document.status.is_terminal()
            || document.linked_document_id.is_none()
        {
            return;
        }
        if let Err(e) = self.reconcile_dependency(document.document_id).await {
            // The child's transition is committed; reconcile_dependency can replay this
            log_error(
                "workflow_engine",
                "reconcile_dependency",
                &e.to_string(),
                Some(&format!("child {}", document.document_id)),
            );
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn get_document(&self, document_id: Uuid) -> WorkflowResult<Document> {
        self.load_document(document_id).await
    }

    /// Every task of the document across rounds, ordered by round then step
    pub async fn get_document_workflow(&self, document_id: Uuid) -> WorkflowResult<Vec<WorkflowTask>> {
        self.load_document(document_id).await?;
        Ok(self.store.tasks_for_document(document_id).await?)
    }

    /// Tasks assigned to a validator, oldest assignment first
    pub async fn get_my_tasks(
        &self,
        validator_id: &ValidatorId,
        status: Option<TaskStatus>,
    ) -> WorkflowResult<Vec<WorkflowTask>> {
        Ok(self.store.tasks_for_validator(validator_id, status).await?)
    }

    /// Status audit trail, oldest first
    pub async fn get_document_history(
        &self,
        document_id: Uuid,
    ) -> WorkflowResult<Vec<DocumentTransition>> {
        self.load_document(document_id).await?;
        Ok(self.store.transitions_for_document(document_id).await?)
    }

    /// Counts and aggregated outcome of the current round
    pub async fn round_summary(&self, document_id: Uuid) -> WorkflowResult<RoundSummary> {
        let snapshot = self.load_snapshot(document_id).await?;
        Ok(RoundSummary::from_round(&snapshot.document, &snapshot.tasks))
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn load_document(&self, document_id: Uuid) -> WorkflowResult<Document> {
        self.store
            .find_document(document_id)
            .await?
            .ok_or_else(|| WorkflowError::document_not_found(document_id))
    }

    async fn load_task(&self, workflow_task_id: Uuid) -> WorkflowResult<WorkflowTask> {
        self.store
            .find_task(workflow_task_id)
            .await?
            .ok_or_else(|| WorkflowError::task_not_found(workflow_task_id))
    }

    async fn load_snapshot(&self, document_id: Uuid) -> WorkflowResult<RoundSnapshot> {
        self.store
            .load_round_snapshot(document_id)
            .await?
            .ok_or_else(|| WorkflowError::document_not_found(document_id))
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Err(e) = self.publisher.publish(event) {
            warn!(error = %e, "Failed to publish lifecycle event");
        }
    }

    fn emit_status_change(&self, document: &Document, previous_status: DocumentStatus) {
        if document.status == previous_status {
            return;
        }
        if let Some(name) = constants::document_event_name(Some(previous_status), document.status) {
            self.emit(
                WorkflowEvent::for_document(name, document)
                    .with_field("previous_status", previous_status.as_str()),
            );
        }
    }
}
