use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events that can trigger document state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DocumentEvent {
    /// Submit (or resubmit) the document to a validator round
    Submit { round: u32 },
    /// Flag an in-flight document as actively being worked on
    MarkInProgress,
    /// Drop the in-progress marker
    Release,
    /// Every task of the current round approved
    AllApproved,
    /// A task of the current round rejected
    Rejected,
    /// Aggregation found pending tasks; the document stays in flight
    StillPending,
    /// A validator spawned a child document
    SpawnDependency { child_document_id: Uuid },
    /// The child document was validated (or dropped by policy)
    DependencyResolved { child_document_id: Uuid },
}

impl DocumentEvent {
    /// Get a string representation of the event type for logging and audit rows
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::MarkInProgress => "mark_in_progress",
            Self::Release => "release",
            Self::AllApproved => "all_approved",
            Self::Rejected => "rejected",
            Self::StillPending => "still_pending",
            Self::SpawnDependency { .. } => "spawn_dependency",
            Self::DependencyResolved { .. } => "dependency_resolved",
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AllApproved | Self::Rejected)
    }

    /// Child document referenced by dependency events
    pub fn child_document_id(&self) -> Option<Uuid> {
        match self {
            Self::SpawnDependency { child_document_id }
            | Self::DependencyResolved { child_document_id } => Some(*child_document_id),
            _ => None,
        }
    }
}

/// Events that can trigger validator task transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TaskEvent {
    Approve(Option<String>),
    Reject(Option<String>),
}

impl TaskEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Approve(_) => "approve",
            Self::Reject(_) => "reject",
        }
    }

    /// Comment attached to the decision, if any
    pub fn comment(&self) -> Option<&str> {
        match self {
            Self::Approve(comment) | Self::Reject(comment) => comment.as_deref(),
        }
    }
}
