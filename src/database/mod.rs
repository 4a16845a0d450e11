//! # Database Operations
//!
//! Persistence for the validation workflow.
//!
//! ## Key Components
//!
//! - [`store`] - The [`WorkflowStore`] trait and the atomic [`ChangeSet`] unit of work
//! - [`memory_store`] - Process-local store behind a `parking_lot` lock
//! - [`pg_store`] - PostgreSQL store with optimistic `lock_version` checks (feature `postgres`)
//! - [`migrations`] - Embedded SQLx migrations (feature `postgres`)

pub mod memory_store;
#[cfg(feature = "postgres")]
pub mod migrations;
#[cfg(feature = "postgres")]
pub mod pg_store;
pub mod store;

pub use memory_store::MemoryWorkflowStore;
#[cfg(feature = "postgres")]
pub use migrations::run_migrations;
#[cfg(feature = "postgres")]
pub use pg_store::PgWorkflowStore;
pub use store::{ChangeSet, DocumentWrite, RoundSnapshot, StoreError, StoreResult, WorkflowStore};
