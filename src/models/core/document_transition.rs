//! # Document Transition Model
//!
//! Audit trail of document status changes.
//!
//! Each committed status change appends one row. Rows of a document are
//! ordered by `sort_key` (1, 2, 3, ...) and exactly one row carries
//! `most_recent = true`, mirroring the current status. Stores assign the sort
//! key and flip the previous `most_recent` flag inside the same commit that
//! changes the status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::DocumentStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTransition {
    pub document_id: Uuid,
    pub from_status: Option<DocumentStatus>,
    pub to_status: DocumentStatus,
    pub event: String,
    pub sort_key: i32,
    pub most_recent: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// New DocumentTransition for creation (sort key and flags assigned by the store)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocumentTransition {
    pub document_id: Uuid,
    pub from_status: Option<DocumentStatus>,
    pub to_status: DocumentStatus,
    pub event: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewDocumentTransition {
    /// Materialize the row once the store has chosen its sort key
    pub fn into_transition(self, sort_key: i32) -> DocumentTransition {
        DocumentTransition {
            document_id: self.document_id,
            from_status: self.from_status,
            to_status: self.to_status,
            event: self.event,
            sort_key,
            most_recent: true,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}
