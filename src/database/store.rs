//! # Workflow Store
//!
//! Persistence seam for documents, validator tasks and the status audit trail.
//!
//! Reads are plain lookups. Every workflow operation writes through a single
//! [`ChangeSet`] handed to [`WorkflowStore::commit`], which implementations
//! must apply atomically: either every document, task and transition in the
//! set becomes visible, or none does. Document updates carry the version the
//! caller read; a mismatch fails the whole commit with
//! [`StoreError::VersionConflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Document, DocumentTransition, NewDocumentTransition, ValidatorId, WorkflowTask};
use crate::state_machine::TaskStatus;

/// Specific error type for persistence operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Version conflict for document {document_id}: expected version {expected}")]
    VersionConflict { document_id: Uuid, expected: i64 },

    #[error("Document {0} already exists")]
    DuplicateDocument(Uuid),

    #[error("Document {0} does not exist")]
    MissingDocument(Uuid),

    #[error("Database constraint violation: {constraint}")]
    ConstraintViolation { constraint: String },

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single document write inside a commit
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentWrite {
    /// Create a new document row
    Insert(Document),
    /// Replace an existing row if its stored version still equals `expected_version`
    Update {
        document: Document,
        expected_version: i64,
    },
}

impl DocumentWrite {
    pub fn document(&self) -> &Document {
        match self {
            Self::Insert(document) | Self::Update { document, .. } => document,
        }
    }
}

/// Unit of work applied atomically by [`WorkflowStore::commit`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub documents: Vec<DocumentWrite>,
    /// Inserted or replaced by `workflow_task_id`
    pub tasks: Vec<WorkflowTask>,
    pub transitions: Vec<NewDocumentTransition>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_document(&mut self, document: Document) -> &mut Self {
        self.documents.push(DocumentWrite::Insert(document));
        self
    }

    /// Queue an update; bumps the document's `lock_version` and remembers the one read
    pub fn update_document(&mut self, mut document: Document) -> &mut Self {
        let expected_version = document.lock_version;
        document.lock_version = expected_version + 1;
        self.documents.push(DocumentWrite::Update {
            document,
            expected_version,
        });
        self
    }

    pub fn upsert_task(&mut self, task: WorkflowTask) -> &mut Self {
        self.tasks.push(task);
        self
    }

    pub fn record_transition(&mut self, transition: Option<NewDocumentTransition>) -> &mut Self {
        if let Some(transition) = transition {
            self.transitions.push(transition);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.tasks.is_empty() && self.transitions.is_empty()
    }

    /// Document written by this change set with the given id, if any
    pub fn written_document(&self, document_id: Uuid) -> Option<&Document> {
        self.documents
            .iter()
            .map(DocumentWrite::document)
            .find(|doc| doc.document_id == document_id)
    }
}

/// A document together with the tasks of its current round, read consistently
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSnapshot {
    pub document: Document,
    pub tasks: Vec<WorkflowTask>,
}

/// Trait for persisting the validation workflow
#[async_trait]
pub trait WorkflowStore: Send + Sync + std::fmt::Debug {
    async fn find_document(&self, document_id: Uuid) -> StoreResult<Option<Document>>;

    async fn find_task(&self, workflow_task_id: Uuid) -> StoreResult<Option<WorkflowTask>>;

    /// Document plus the tasks of its current round
    async fn load_round_snapshot(&self, document_id: Uuid) -> StoreResult<Option<RoundSnapshot>>;

    /// Every task of the document across all rounds, ordered by round then step
    async fn tasks_for_document(&self, document_id: Uuid) -> StoreResult<Vec<WorkflowTask>>;

    /// Tasks assigned to a validator, optionally filtered by status, oldest assignment first
    async fn tasks_for_validator(
        &self,
        validator_id: &ValidatorId,
        status: Option<TaskStatus>,
    ) -> StoreResult<Vec<WorkflowTask>>;

    /// Pending tasks assigned before `cutoff` that a validator can act on
    ///
    /// Only tasks of the current round of in-flight documents qualify. Tasks
    /// left pending by an earlier round, or held by a paused or terminal
    /// document, are excluded at the source.
    async fn overdue_candidates(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<WorkflowTask>>;

    /// Status audit trail ordered by sort key
    async fn transitions_for_document(
        &self,
        document_id: Uuid,
    ) -> StoreResult<Vec<DocumentTransition>>;

    /// Apply a change set atomically
    async fn commit(&self, changes: ChangeSet) -> StoreResult<()>;
}
