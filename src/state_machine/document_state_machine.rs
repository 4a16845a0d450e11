use chrono::{DateTime, Utc};

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::DocumentEvent,
    states::DocumentStatus,
};
use crate::models::{Document, NewDocumentTransition};

/// Transition table for the document lifecycle.
///
/// Pairs not listed in [`DocumentStateMachine::determine_target_state`] are
/// rejected; callers surface that as an invalid-state error.
pub struct DocumentStateMachine;

impl DocumentStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: DocumentStatus,
        event: &DocumentEvent,
    ) -> StateMachineResult<DocumentStatus> {
        use DocumentStatus::*;

        let target = match (current_state, event) {
            // Submission and resubmission
            (Draft, DocumentEvent::Submit { .. }) => PendingValidation,
            (Rejected, DocumentEvent::Submit { .. }) => PendingValidation,

            // In-flight reporting marker
            (PendingValidation, DocumentEvent::MarkInProgress) => InProgress,
            (InProgress, DocumentEvent::Release) => PendingValidation,

            // Aggregation outcomes
            (PendingValidation | InProgress, DocumentEvent::AllApproved) => Validated,
            (PendingValidation | InProgress, DocumentEvent::Rejected) => Rejected,
            (state @ (PendingValidation | InProgress), DocumentEvent::StillPending) => state,

            // Dependency pause and resume
            (PendingValidation, DocumentEvent::SpawnDependency { .. }) => AwaitingDependency,
            (AwaitingDependency, DocumentEvent::DependencyResolved { .. }) => PendingValidation,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    /// Apply an event to a document.
    ///
    /// Returns the audit row to persist, or `None` when the status did not
    /// change (e.g. aggregation found pending tasks).
    pub fn apply(
        document: &mut Document,
        event: &DocumentEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<Option<NewDocumentTransition>> {
        let from_state = document.status;
        let target_state = Self::determine_target_state(from_state, event)?;

        if target_state == from_state {
            return Ok(None);
        }

        document.status = target_state;
        document.updated_at = now;

        let metadata = serde_json::to_value(event).unwrap_or_else(|_| serde_json::json!({}));

        Ok(Some(NewDocumentTransition {
            document_id: document.document_id,
            from_status: Some(from_state),
            to_status: target_state,
            event: event.event_type().to_string(),
            metadata,
            created_at: now,
        }))
    }

    /// Audit row recording a document's creation in `draft`
    pub fn initial_transition(document: &Document) -> NewDocumentTransition {
        NewDocumentTransition {
            document_id: document.document_id,
            from_status: None,
            to_status: document.status,
            event: "create".to_string(),
            metadata: serde_json::json!({
                "title": document.title,
                "category": document.category,
            }),
            created_at: document.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDocument;
    use uuid::Uuid;

    fn doc_in(status: DocumentStatus) -> Document {
        let mut doc = Document::from_draft(NewDocument::new("Rapport", "Audit"), Utc::now());
        doc.status = status;
        doc
    }

    #[test]
    fn test_state_transitions() {
        use DocumentStatus::*;
        let child = Uuid::new_v4();

        let cases = [
            (Draft, DocumentEvent::Submit { round: 1 }, PendingValidation),
            (Rejected, DocumentEvent::Submit { round: 2 }, PendingValidation),
            (PendingValidation, DocumentEvent::AllApproved, Validated),
            (InProgress, DocumentEvent::AllApproved, Validated),
            (PendingValidation, DocumentEvent::Rejected, Rejected),
            (InProgress, DocumentEvent::StillPending, InProgress),
            (PendingValidation, DocumentEvent::MarkInProgress, InProgress),
            (InProgress, DocumentEvent::Release, PendingValidation),
            (
                PendingValidation,
                DocumentEvent::SpawnDependency {
                    child_document_id: child,
                },
                AwaitingDependency,
            ),
            (
                AwaitingDependency,
                DocumentEvent::DependencyResolved {
                    child_document_id: child,
                },
                PendingValidation,
            ),
        ];

        for (from, event, to) in cases {
            assert_eq!(
                DocumentStateMachine::determine_target_state(from, &event).unwrap(),
                to,
                "{from} --{}--> {to}",
                event.event_type()
            );
        }
    }

    #[test]
    fn test_invalid_transitions() {
        use DocumentStatus::*;
        let child = Uuid::new_v4();

        let invalid = [
            (Validated, DocumentEvent::Submit { round: 2 }),
            (PendingValidation, DocumentEvent::Submit { round: 2 }),
            (AwaitingDependency, DocumentEvent::AllApproved),
            (AwaitingDependency, DocumentEvent::Rejected),
            (
                AwaitingDependency,
                DocumentEvent::SpawnDependency {
                    child_document_id: child,
                },
            ),
            (
                InProgress,
                DocumentEvent::SpawnDependency {
                    child_document_id: child,
                },
            ),
            (
                PendingValidation,
                DocumentEvent::DependencyResolved {
                    child_document_id: child,
                },
            ),
            (Draft, DocumentEvent::AllApproved),
            (Draft, DocumentEvent::MarkInProgress),
        ];

        for (from, event) in invalid {
            let err = DocumentStateMachine::determine_target_state(from, &event).unwrap_err();
            assert!(matches!(err, StateMachineError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_apply_records_transition_only_on_change() {
        let mut doc = doc_in(DocumentStatus::PendingValidation);
        let now = Utc::now();

        let unchanged =
            DocumentStateMachine::apply(&mut doc, &DocumentEvent::StillPending, now).unwrap();
        assert!(unchanged.is_none());

        let row = DocumentStateMachine::apply(&mut doc, &DocumentEvent::Rejected, now)
            .unwrap()
            .expect("status changed");
        assert_eq!(row.from_status, Some(DocumentStatus::PendingValidation));
        assert_eq!(row.to_status, DocumentStatus::Rejected);
        assert_eq!(row.event, "rejected");
        assert_eq!(doc.status, DocumentStatus::Rejected);
    }

    #[test]
    fn test_apply_leaves_document_untouched_on_error() {
        let mut doc = doc_in(DocumentStatus::Validated);
        let before = doc.clone();
        assert!(
            DocumentStateMachine::apply(&mut doc, &DocumentEvent::Submit { round: 2 }, Utc::now())
                .is_err()
        );
        assert_eq!(doc, before);
    }
}
