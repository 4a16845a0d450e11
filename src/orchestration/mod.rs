//! # Orchestration Engine
//!
//! Coordination layer of the validation workflow.
//!
//! ## Core Components
//!
//! - **WorkflowEngine**: entry point for every operation; serializes work per
//!   document and commits each change atomically
//! - **TaskAssignment**: plans a validation round, one task per validator
//! - **AggregationEngine**: derives the document status from its round's tasks
//! - **DependencyOrchestrator**: pauses a document on a child document and
//!   resumes it once the child settles
//! - **DocumentLockRegistry**: per-document async locks
//! - **ConflictRetryPolicy**: bounded retry of optimistic-lock conflicts
//! - **SlaMonitor**: background reporting of overdue tasks
//!
//! Planners are pure: they take snapshots and return a [`ChangeSet`] for the
//! engine to commit.
//!
//! [`ChangeSet`]: crate::database::ChangeSet

pub mod aggregation;
pub mod dependency_orchestrator;
pub mod document_locks;
pub mod retry;
pub mod sla_monitor;
pub mod task_assignment;
pub mod workflow_engine;

// Re-export core types and components for easy access
pub use aggregation::{aggregate, AggregationEngine, RoundOutcome, RoundSummary};
pub use dependency_orchestrator::{
    DependencyInitiation, DependencyOrchestrator, DependencyResolution, ResolutionKind,
};
pub use document_locks::{DocumentLockGuard, DocumentLockRegistry};
pub use retry::ConflictRetryPolicy;
pub use sla_monitor::SlaMonitor;
pub use task_assignment::{RoundAssignment, TaskAssignment};
pub use workflow_engine::{Decision, DecisionOutcome, WorkflowEngine, WorkflowEngineBuilder};
