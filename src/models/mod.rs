//! # Models
//!
//! Data layer for the validation workflow: documents, validator tasks and the
//! document status audit trail. Models are storage-agnostic; the
//! [`crate::database`] module maps them onto the in-memory or PostgreSQL
//! stores.

pub mod core;

// Re-export core models for easy access
pub use self::core::document::{AttachmentRef, Document, NewDocument};
pub use self::core::document_transition::{DocumentTransition, NewDocumentTransition};
pub use self::core::validator::ValidatorId;
pub use self::core::workflow_task::{sort_for_timeline, WorkflowTask};
