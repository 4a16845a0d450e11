pub mod document;
pub mod document_transition;
pub mod validator;
pub mod workflow_task;
