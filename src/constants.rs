//! # System Constants
//!
//! Lifecycle event names, status groupings and limits shared across the
//! workflow engine.

use std::collections::HashMap;
use std::sync::OnceLock;

pub use crate::state_machine::{DocumentStatus, TaskStatus};

/// Lifecycle event names published on the [`crate::events::EventPublisher`]
pub mod events {
    // Document lifecycle events
    pub const DOCUMENT_REGISTERED: &str = "document.registered";
    pub const DOCUMENT_SUBMITTED: &str = "document.submitted";
    pub const DOCUMENT_IN_PROGRESS: &str = "document.in_progress";
    pub const DOCUMENT_RELEASED: &str = "document.released";
    pub const DOCUMENT_VALIDATED: &str = "document.validated";
    pub const DOCUMENT_REJECTED: &str = "document.rejected";

    // Validator task events
    pub const TASK_ASSIGNED: &str = "task.assigned";
    pub const TASK_DECIDED: &str = "task.decided";
    pub const TASK_REACTIVATED: &str = "task.reactivated";
    pub const TASK_OVERDUE: &str = "task.overdue";

    // Dependency orchestration events
    pub const DEPENDENCY_SPAWNED: &str = "dependency.spawned";
    pub const DEPENDENCY_RESOLVED: &str = "dependency.resolved";
    pub const DEPENDENCY_CHILD_REJECTED: &str = "dependency.child_rejected";

    // Notifications relayed by the broadcast notifier
    pub const NOTIFICATION_TASK_ASSIGNED: &str = "notification.task_assigned";
    pub const NOTIFICATION_TASK_REACTIVATED: &str = "notification.task_reactivated";
    pub const NOTIFICATION_TASK_OVERDUE: &str = "notification.task_overdue";
}

/// System-wide constants
pub mod system {
    /// Version compatibility marker
    pub const DOCFLOW_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Audit event name of the creation row
    pub const CREATE_EVENT: &str = "create";

    /// Comment written on the originating task when a rejected child rejects its parent
    pub const CHILD_REJECTED_COMMENT: &str = "Automatically rejected: linked document was rejected";

    /// Upper bound on validators in one round
    pub const MAX_VALIDATORS_PER_ROUND: usize = 100;
}

/// Status groupings for validation and logic
pub mod status_groups {
    use super::{DocumentStatus, TaskStatus};

    /// Document statuses that end a workflow
    pub const DOCUMENT_FINAL_STATES: &[DocumentStatus] =
        &[DocumentStatus::Validated, DocumentStatus::Rejected];

    /// Document statuses in which aggregation runs
    pub const DOCUMENT_IN_FLIGHT_STATES: &[DocumentStatus] =
        &[DocumentStatus::PendingValidation, DocumentStatus::InProgress];

    /// Document statuses from which a new round may start
    pub const DOCUMENT_SUBMITTABLE_STATES: &[DocumentStatus] =
        &[DocumentStatus::Draft, DocumentStatus::Rejected];

    /// Task statuses that carry a decision
    pub const TASK_DECIDED_STATES: &[TaskStatus] = &[TaskStatus::Approved, TaskStatus::Rejected];
}

/// Audit event name keyed by (from, to) document status
pub type DocumentTransitionKey = (Option<DocumentStatus>, DocumentStatus);
pub type DocumentTransitionMap = HashMap<DocumentTransitionKey, &'static str>;

/// Build the map from document status changes to lifecycle event names
pub fn build_document_transition_map() -> DocumentTransitionMap {
    use DocumentStatus::*;

    let mut map = HashMap::new();

    map.insert((None, Draft), events::DOCUMENT_REGISTERED);

    map.insert((Some(Draft), PendingValidation), events::DOCUMENT_SUBMITTED);
    map.insert((Some(Rejected), PendingValidation), events::DOCUMENT_SUBMITTED);

    map.insert((Some(PendingValidation), InProgress), events::DOCUMENT_IN_PROGRESS);
    map.insert((Some(InProgress), PendingValidation), events::DOCUMENT_RELEASED);

    for from in [PendingValidation, InProgress] {
        map.insert((Some(from), Validated), events::DOCUMENT_VALIDATED);
        map.insert((Some(from), Rejected), events::DOCUMENT_REJECTED);
    }

    map.insert((Some(PendingValidation), AwaitingDependency), events::DEPENDENCY_SPAWNED);
    map.insert((Some(AwaitingDependency), PendingValidation), events::DEPENDENCY_RESOLVED);

    map
}

/// Lifecycle event name for a document status change, if it is a known one
pub fn document_event_name(
    from: Option<DocumentStatus>,
    to: DocumentStatus,
) -> Option<&'static str> {
    static MAP: OnceLock<DocumentTransitionMap> = OnceLock::new();
    MAP.get_or_init(build_document_transition_map)
        .get(&(from, to))
        .copied()
}
