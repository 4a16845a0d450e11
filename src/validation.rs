//! Input validation for the workflow engine
//!
//! Checks caller-supplied drafts and validator sets before any state is
//! touched, and defines the [`ValidatorDirectory`] collaborator consulted to
//! confirm that validator ids refer to known actors.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::constants::system::MAX_VALIDATORS_PER_ROUND;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{NewDocument, ValidatorId};

/// Maximum title length accepted for a document
const MAX_TITLE_LENGTH: usize = 500;

/// Maximum category label length
const MAX_CATEGORY_LENGTH: usize = 200;

/// Maximum validator id length
const MAX_VALIDATOR_ID_LENGTH: usize = 255;

/// Validates a document draft before it is registered
pub fn validate_document_draft(draft: &NewDocument) -> WorkflowResult<()> {
    if draft.title.trim().is_empty() {
        return Err(WorkflowError::InvalidState(
            "Document title must not be blank".to_string(),
        ));
    }
    if draft.title.chars().count() > MAX_TITLE_LENGTH {
        return Err(WorkflowError::InvalidState(format!(
            "Document title too long (max: {MAX_TITLE_LENGTH} chars)"
        )));
    }
    if draft.category.chars().count() > MAX_CATEGORY_LENGTH {
        return Err(WorkflowError::InvalidState(format!(
            "Document category too long (max: {MAX_CATEGORY_LENGTH} chars)"
        )));
    }
    Ok(())
}

/// Validates the validator set of a submission round
///
/// Order is preserved by the caller; this only rejects empty sets, blank or
/// oversized ids and repeated members.
pub fn validate_validator_set(validators: &[ValidatorId]) -> WorkflowResult<()> {
    if validators.is_empty() {
        return Err(WorkflowError::EmptyValidatorSet);
    }
    if validators.len() > MAX_VALIDATORS_PER_ROUND {
        return Err(WorkflowError::InvalidState(format!(
            "Too many validators: {} (max: {MAX_VALIDATORS_PER_ROUND})",
            validators.len()
        )));
    }

    let mut seen = HashSet::with_capacity(validators.len());
    for validator in validators {
        let id = validator.as_str();
        if id.trim().is_empty() {
            return Err(WorkflowError::InvalidState(
                "Validator id must not be blank".to_string(),
            ));
        }
        if id.len() > MAX_VALIDATOR_ID_LENGTH {
            return Err(WorkflowError::InvalidState(format!(
                "Validator id too long: {} bytes (max: {MAX_VALIDATOR_ID_LENGTH})",
                id.len()
            )));
        }
        if !seen.insert(id) {
            return Err(WorkflowError::DuplicateValidator {
                validator_id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Lookup of known validator identities, owned by the user administration side
#[async_trait]
pub trait ValidatorDirectory: Send + Sync + std::fmt::Debug {
    async fn exists(&self, validator_id: &ValidatorId) -> bool;
}

/// Directory that knows every id; the default when no administration backend is wired
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllDirectory;

#[async_trait]
impl ValidatorDirectory for AllowAllDirectory {
    async fn exists(&self, _validator_id: &ValidatorId) -> bool {
        true
    }
}

/// Fixed set of validator ids
#[derive(Debug, Clone, Default)]
pub struct StaticValidatorDirectory {
    known: HashSet<ValidatorId>,
}

impl StaticValidatorDirectory {
    pub fn new<I, V>(ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ValidatorId>,
    {
        Self {
            known: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, id: impl Into<ValidatorId>) {
        self.known.insert(id.into());
    }
}

#[async_trait]
impl ValidatorDirectory for StaticValidatorDirectory {
    async fn exists(&self, validator_id: &ValidatorId) -> bool {
        self.known.contains(validator_id)
    }
}

/// Fails with `NotFound` on the first id the directory does not know
pub async fn ensure_validators_known(
    directory: &dyn ValidatorDirectory,
    validators: &[ValidatorId],
) -> WorkflowResult<()> {
    for validator in validators {
        if !directory.exists(validator).await {
            return Err(WorkflowError::validator_not_found(validator.as_str()));
        }
    }
    Ok(())
}
