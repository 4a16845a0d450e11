//! # Document Model
//!
//! A unit of content subject to approval.
//!
//! ## Overview
//!
//! Documents are created in `draft` on upload and move through validation
//! rounds. The core only tracks what the workflow needs: identity, display
//! metadata, lifecycle status, the dependency link and the round counter.
//! File bytes live in the external file store; the document keeps an opaque
//! [`AttachmentRef`] to them.
//!
//! ## Dependency Link
//!
//! `linked_document_id` carries both sides of the single supported
//! dependency pattern:
//! - on a paused parent, the child it is waiting on (cleared on resume)
//! - on a child, the parent it will unblock (kept for audit)
//!
//! ## Optimistic Concurrency
//!
//! `lock_version` increases by one on every committed write. Stores reject a
//! write whose expected version does not match the stored row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::DocumentStatus;

/// Opaque reference to a file owned by the external file store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub storage_key: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl AttachmentRef {
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
            file_name: None,
            content_type: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A document tracked by the validation workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub document_id: Uuid,
    pub title: String,
    /// Free-form label, e.g. "Demande de Travaux"
    pub category: String,
    pub status: DocumentStatus,
    pub linked_document_id: Option<Uuid>,
    /// Number of validation rounds started so far (0 while never submitted)
    pub current_round: u32,
    pub attachment: Option<AttachmentRef>,
    pub lock_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Draft used to register a document (upload flow or dependency spawn)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub category: String,
    pub attachment: Option<AttachmentRef>,
}

impl NewDocument {
    /// Create a new document draft with the required display fields
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            attachment: None,
        }
    }

    /// Attach a stored file to the draft
    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

impl Document {
    /// Build a fresh `draft` document from a draft request
    pub fn from_draft(draft: NewDocument, now: DateTime<Utc>) -> Self {
        Self {
            document_id: Uuid::new_v4(),
            title: draft.title,
            category: draft.category,
            status: DocumentStatus::Draft,
            linked_document_id: None,
            current_round: 0,
            attachment: draft.attachment,
            lock_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when this document is paused waiting on `child_document_id`
    pub fn is_waiting_on(&self, child_document_id: Uuid) -> bool {
        self.status == DocumentStatus::AwaitingDependency
            && self.linked_document_id == Some(child_document_id)
    }

    /// True when the document already has an outstanding dependency link
    pub fn has_dependency_link(&self) -> bool {
        self.linked_document_id.is_some()
    }

    /// Whether a validation round has ever been started
    pub fn has_active_round(&self) -> bool {
        self.current_round > 0
    }
}
