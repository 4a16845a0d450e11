//! Lifecycle event payloads
//!
//! A [`WorkflowEvent`] is a flat record naming what happened (one of the
//! names in [`crate::constants::events`]) and to which document or task,
//! with free-form extra fields flattened next to the core ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Document, WorkflowTask};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Lifecycle event name, e.g. `document.validated`
    pub name: String,

    pub document_id: Uuid,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_task_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator_id: Option<String>,

    /// Document or task status after the change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,

    pub timestamp: DateTime<Utc>,

    /// Additional event-specific fields
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

impl WorkflowEvent {
    pub fn new(name: impl Into<String>, document_id: Uuid) -> Self {
        Self {
            name: name.into(),
            document_id,
            workflow_task_id: None,
            validator_id: None,
            status: None,
            round: None,
            timestamp: Utc::now(),
            additional_fields: HashMap::new(),
        }
    }

    /// Event about a document, carrying its status and round
    pub fn for_document(name: impl Into<String>, document: &Document) -> Self {
        let mut event = Self::new(name, document.document_id);
        event.status = Some(document.status.to_string());
        event.round = Some(document.current_round);
        event
    }

    /// Event about a validator task
    pub fn for_task(name: impl Into<String>, task: &WorkflowTask) -> Self {
        let mut event = Self::new(name, task.document_id);
        event.workflow_task_id = Some(task.workflow_task_id);
        event.validator_id = Some(task.validator_id.to_string());
        event.status = Some(task.status.to_string());
        event.round = Some(task.round);
        event
    }

    /// Add custom field to payload
    pub fn with_field<K: ToString, V: Into<serde_json::Value>>(mut self, key: K, value: V) -> Self {
        self.additional_fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.additional_fields.get(key)
    }
}
