// State machine module for the document validation workflow
//
// Closed status enums with their string contract, the event types that drive
// them, guard predicates and the transition tables for documents and tasks.

pub mod document_state_machine;
pub mod errors;
pub mod events;
pub mod guards;
pub mod states;
pub mod task_state_machine;

// Re-export main types for convenient access
pub use document_state_machine::DocumentStateMachine;
pub use errors::{StateMachineError, StateMachineResult};
pub use events::{DocumentEvent, TaskEvent};
pub use states::{DocumentStatus, TaskStatus};
pub use task_state_machine::TaskStateMachine;

// Common traits and utilities
pub use guards::StateGuard;
