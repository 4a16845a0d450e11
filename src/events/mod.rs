//! # Lifecycle Events
//!
//! In-process broadcast of workflow lifecycle events for observers such as
//! reporting or SLA dashboards. Separate from the notification hook, which
//! addresses validators.

pub mod publisher;
pub mod types;

// Re-export key types for convenience
pub use publisher::{EventPublisher, EventPublisherStats, PublishError};
pub use types::WorkflowEvent;
