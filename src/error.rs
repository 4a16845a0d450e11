//! Error types for the validation workflow.
//!

use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigurationError;
use crate::database::StoreError;
use crate::state_machine::StateMachineError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    /// Operation attempted against a document or task in an incompatible state
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Validator set is empty")]
    EmptyValidatorSet,
    #[error("Validator {validator_id} listed more than once")]
    DuplicateValidator { validator_id: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    /// Two operations raced on the same document; retried internally before surfacing
    #[error("Concurrent modification detected for document {document_id}")]
    ConcurrencyConflict { document_id: Uuid },
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl WorkflowError {
    pub fn document_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Document",
            id: id.to_string(),
        }
    }

    pub fn task_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "WorkflowTask",
            id: id.to_string(),
        }
    }

    pub fn validator_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "Validator",
            id: id.to_string(),
        }
    }

    /// Only concurrency conflicts are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Errors the caller can fix (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidState(_)
                | Self::EmptyValidatorSet
                | Self::DuplicateValidator { .. }
                | Self::NotFound { .. }
        )
    }
}

impl From<StateMachineError> for WorkflowError {
    fn from(err: StateMachineError) -> Self {
        WorkflowError::InvalidState(err.to_string())
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { document_id, .. } => {
                WorkflowError::ConcurrencyConflict { document_id }
            }
            other => WorkflowError::Storage(other.to_string()),
        }
    }
}

impl From<ConfigurationError> for WorkflowError {
    fn from(err: ConfigurationError) -> Self {
        WorkflowError::Configuration(err.to_string())
    }
}

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;
