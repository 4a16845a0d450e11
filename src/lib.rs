#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Docflow Core
//!
//! Document validation workflow engine.
//!
//! ## Overview
//!
//! A document is submitted to an ordered set of validators. Each validator
//! gets a task and records an approval or a rejection; the document's status
//! is derived from the tasks of its current round. Any rejection rejects the
//! document, unanimous approval validates it. A rejected document can be
//! resubmitted, which opens a new round and leaves earlier rounds as history.
//!
//! While deciding, a validator may make the document depend on a new child
//! document. The parent pauses in `en_attente_dependance` until the child
//! completes its own validation, then resumes with the validator's task
//! actionable again.
//!
//! ## Module Organization
//!
//! - [`models`] - Documents, validator tasks and the status audit trail
//! - [`state_machine`] - Document and task statuses, events and guards
//! - [`orchestration`] - Workflow engine, aggregation and dependency handling
//! - [`database`] - Storage trait with in-memory and PostgreSQL backends
//! - [`config`] - Layered configuration
//! - [`events`] - Lifecycle event broadcasting
//! - [`notifications`] - Validator notification hooks
//! - [`validation`] - Input validation and the validator directory
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docflow_core::models::{NewDocument, ValidatorId};
//! use docflow_core::orchestration::{Decision, WorkflowEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = WorkflowEngine::in_memory();
//!
//! let document = engine
//!     .register_document(NewDocument::new("Contrat fournisseur", "Achats"))
//!     .await?;
//! let tasks = engine
//!     .submit_for_validation(
//!         document.document_id,
//!         vec![ValidatorId::from("alice"), ValidatorId::from("bob")],
//!     )
//!     .await?;
//!
//! for task in &tasks {
//!     engine
//!         .decide(task.workflow_task_id, Decision::Approved, None)
//!         .await?;
//! }
//! let document = engine.get_document(document.document_id).await?;
//! println!("{} is {}", document.title, document.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests; PostgreSQL tests are #[ignore]d and need DATABASE_URL
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod orchestration;
pub mod state_machine;
pub mod validation;

pub use config::{ChildRejectionPolicy, ConfigManager, ConfigurationError, DocflowConfig};
pub use constants::{status_groups, system, DocumentStatus, TaskStatus};
// Re-export constants events with different name to avoid conflict
pub use constants::events as lifecycle_events;
pub use database::{MemoryWorkflowStore, StoreError, WorkflowStore};
pub use error::{WorkflowError, WorkflowResult};
pub use events::{EventPublisher, WorkflowEvent};
pub use models::{Document, DocumentTransition, NewDocument, ValidatorId, WorkflowTask};
pub use notifications::NotificationHook;
pub use orchestration::{Decision, DecisionOutcome, RoundSummary, WorkflowEngine};
