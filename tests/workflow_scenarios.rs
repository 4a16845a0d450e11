//! End-to-end validation workflows against the in-memory store

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use docflow_core::lifecycle_events;
use docflow_core::models::NewDocument;
use docflow_core::orchestration::{Decision, RoundOutcome, WorkflowEngine};
use docflow_core::validation::StaticValidatorDirectory;
use docflow_core::{DocumentStatus, TaskStatus, ValidatorId, WorkflowError};
use tokio_test::assert_ok;

#[tokio::test]
async fn test_unanimous_approval_validates_the_document() {
    let engine = TestEngineBuilder::new().build();
    let (doc, tasks) = submitted_document(&engine, "Contrat cadre", &["v1", "v2"]).await;

    let first = engine
        .decide(tasks[0].workflow_task_id, Decision::Approved, None)
        .await
        .unwrap();
    assert_eq!(first.document.status, DocumentStatus::PendingValidation);
    assert!(!first.status_changed());

    let second = engine
        .decide(tasks[1].workflow_task_id, Decision::Approved, Some("RAS".into()))
        .await
        .unwrap();
    assert_eq!(second.document.status, DocumentStatus::Validated);
    assert_eq!(second.task.comment.as_deref(), Some("RAS"));
    assert!(second.task.validated_at.is_some());

    let stored = engine.get_document(doc.document_id).await.unwrap();
    assert_eq!(stored.status, DocumentStatus::Validated);
}

#[tokio::test]
async fn test_single_rejection_rejects_immediately() {
    let engine = TestEngineBuilder::new().build();
    let (doc, tasks) = submitted_document(&engine, "Avenant", &["v1", "v2", "v3"]).await;

    let outcome = engine
        .decide(tasks[1].workflow_task_id, Decision::Rejected, Some("Clause 4".into()))
        .await
        .unwrap();
    assert_eq!(outcome.document.status, DocumentStatus::Rejected);

    // Remaining tasks stay pending for audit
    let workflow = engine.get_document_workflow(doc.document_id).await.unwrap();
    let statuses: Vec<TaskStatus> = workflow.iter().map(|t| t.status).collect();
    assert_eq!(
        statuses,
        vec![TaskStatus::Pending, TaskStatus::Rejected, TaskStatus::Pending]
    );

    // ...but they can no longer be decided
    let err = engine
        .decide(tasks[0].workflow_task_id, Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
}

#[tokio::test]
async fn test_resubmission_opens_a_fresh_round() {
    let engine = TestEngineBuilder::new().build();
    let (doc, first_round) = submitted_document(&engine, "Devis", &["v1", "v2"]).await;
    engine
        .decide(first_round[0].workflow_task_id, Decision::Rejected, None)
        .await
        .unwrap();

    let second_round = engine
        .submit_for_validation(doc.document_id, validators(&["v3"]))
        .await
        .unwrap();
    assert_eq!(second_round.len(), 1);
    assert_eq!(second_round[0].round, 2);

    let resubmitted = engine.get_document(doc.document_id).await.unwrap();
    assert_eq!(resubmitted.status, DocumentStatus::PendingValidation);
    assert_eq!(resubmitted.current_round, 2);

    // The old rejection no longer counts
    let outcome = engine
        .decide(second_round[0].workflow_task_id, Decision::Approved, None)
        .await
        .unwrap();
    assert_eq!(outcome.document.status, DocumentStatus::Validated);

    // History keeps both rounds, ordered by round then step
    let workflow = engine.get_document_workflow(doc.document_id).await.unwrap();
    let rounds: Vec<(u32, u32)> = workflow.iter().map(|t| (t.round, t.step)).collect();
    assert_eq!(rounds, vec![(1, 1), (1, 2), (2, 1)]);

    // Stale first-round tasks cannot be decided
    let err = engine
        .decide(first_round[1].workflow_task_id, Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
}

#[tokio::test]
async fn test_submission_preconditions_are_enforced() {
    let engine = TestEngineBuilder::new().build();
    let doc = engine
        .register_document(NewDocument::new("Rapport", "Qualité"))
        .await
        .unwrap();

    let err = engine
        .submit_for_validation(doc.document_id, vec![])
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::EmptyValidatorSet);

    let err = engine
        .submit_for_validation(doc.document_id, validators(&["v1", "v1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateValidator { .. }));

    engine
        .submit_for_validation(doc.document_id, validators(&["v1"]))
        .await
        .unwrap();
    let err = engine
        .submit_for_validation(doc.document_id, validators(&["v2"]))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
    assert!(err.is_client_error());

    let err = engine
        .submit_for_validation(uuid::Uuid::new_v4(), validators(&["v1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { entity: "Document", .. }));
}

#[tokio::test]
async fn test_unknown_validators_are_refused_before_any_write() {
    let directory = StaticValidatorDirectory::new(["alice", "bob"]);
    let engine = WorkflowEngine::builder(Arc::new(
        docflow_core::MemoryWorkflowStore::new(),
    ))
    .validator_directory(Arc::new(directory))
    .build();

    let doc = engine
        .register_document(NewDocument::new("Budget", "Finance"))
        .await
        .unwrap();
    let err = engine
        .submit_for_validation(doc.document_id, validators(&["alice", "mallory"]))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { entity: "Validator", .. }));

    let unchanged = engine.get_document(doc.document_id).await.unwrap();
    assert_eq!(unchanged.status, DocumentStatus::Draft);
    assert!(engine
        .get_document_workflow(doc.document_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_inbox_lists_tasks_per_validator() {
    let engine = TestEngineBuilder::new().build();
    let (_, first) = submitted_document(&engine, "Facture A", &["alice", "bob"]).await;
    let (_, _second) = submitted_document(&engine, "Facture B", &["alice"]).await;
    engine
        .decide(first[0].workflow_task_id, Decision::Approved, None)
        .await
        .unwrap();

    let alice = ValidatorId::from("alice");
    let all = engine.get_my_tasks(&alice, None).await.unwrap();
    assert_eq!(all.len(), 2);
    let pending = engine
        .get_my_tasks(&alice, Some(TaskStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    let approved = engine
        .get_my_tasks(&alice, Some(TaskStatus::Approved))
        .await
        .unwrap();
    assert_eq!(approved[0].workflow_task_id, first[0].workflow_task_id);

    let nobody = engine
        .get_my_tasks(&ValidatorId::from("carol"), None)
        .await
        .unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn test_history_records_every_status_change() {
    let engine = TestEngineBuilder::new().build();
    let (doc, tasks) = submitted_document(&engine, "Procès-verbal", &["v1"]).await;
    engine
        .decide(tasks[0].workflow_task_id, Decision::Rejected, None)
        .await
        .unwrap();

    let history = engine.get_document_history(doc.document_id).await.unwrap();
    let steps: Vec<(Option<DocumentStatus>, DocumentStatus)> = history
        .iter()
        .map(|t| (t.from_status, t.to_status))
        .collect();
    assert_eq!(
        steps,
        vec![
            (None, DocumentStatus::Draft),
            (Some(DocumentStatus::Draft), DocumentStatus::PendingValidation),
            (Some(DocumentStatus::PendingValidation), DocumentStatus::Rejected),
        ]
    );
    assert!(history.last().unwrap().most_recent);
    assert_eq!(history.iter().filter(|t| t.most_recent).count(), 1);
}

#[tokio::test]
async fn test_round_summary_reports_progress() {
    let engine = TestEngineBuilder::new().build();
    let (doc, tasks) = submitted_document(&engine, "Note", &["v1", "v2", "v3", "v4"]).await;
    engine
        .decide(tasks[0].workflow_task_id, Decision::Approved, None)
        .await
        .unwrap();

    let summary = engine.round_summary(doc.document_id).await.unwrap();
    assert_eq!(summary.round, 1);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.approved, 1);
    assert_eq!(summary.pending, 3);
    assert_eq!(summary.outcome, RoundOutcome::Pending);
    assert!((summary.completion_ratio() - 0.25).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_notification_failures_do_not_roll_back() {
    let engine = TestEngineBuilder::new()
        .with_notifier(Arc::new(FailingNotifier))
        .build();
    let (doc, tasks) = submitted_document(&engine, "Mandat", &["v1"]).await;
    assert_eq!(tasks.len(), 1);

    let stored = engine.get_document(doc.document_id).await.unwrap();
    assert_eq!(stored.status, DocumentStatus::PendingValidation);
}

#[tokio::test]
async fn test_hanging_notifier_does_not_block_submission_or_decisions() {
    let engine = TestEngineBuilder::new()
        .with_notifier(Arc::new(HangingNotifier))
        .with_notification_timeout(Duration::from_millis(50))
        .build();
    let doc = engine
        .register_document(NewDocument::new("Avenant", "Juridique"))
        .await
        .unwrap();

    let tasks = tokio::time::timeout(
        Duration::from_secs(2),
        engine.submit_for_validation(doc.document_id, validators(&["v1", "v2"])),
    )
    .await
    .expect("submission returned despite a stuck transport")
    .unwrap();
    assert_eq!(tasks.len(), 2);

    for task in &tasks {
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            engine.decide(task.workflow_task_id, Decision::Approved, None),
        )
        .await
        .expect("decision returned despite a stuck transport");
        assert_ok!(outcome);
    }
    let stored = engine.get_document(doc.document_id).await.unwrap();
    assert_eq!(stored.status, DocumentStatus::Validated);
}

#[tokio::test]
async fn test_assignment_notifications_fire_once_per_task() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = TestEngineBuilder::new().with_notifier(notifier.clone()).build();
    submitted_document(&engine, "Circulaire", &["v1", "v2", "v3"]).await;
    assert_eq!(notifier.assigned_count(), 3);
}

#[tokio::test]
async fn test_lifecycle_events_are_published_after_commit() {
    let engine = TestEngineBuilder::new().build();
    let mut events = engine.subscribe();
    let (doc, tasks) = submitted_document(&engine, "Attestation", &["v1"]).await;
    engine
        .decide(tasks[0].workflow_task_id, Decision::Approved, None)
        .await
        .unwrap();

    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.document_id, doc.document_id);
        names.push(event.name);
    }
    assert_eq!(
        names,
        vec![
            lifecycle_events::DOCUMENT_REGISTERED,
            lifecycle_events::DOCUMENT_SUBMITTED,
            lifecycle_events::TASK_ASSIGNED,
            lifecycle_events::TASK_DECIDED,
            lifecycle_events::DOCUMENT_VALIDATED,
        ]
    );
}

#[tokio::test]
async fn test_in_progress_documents_still_aggregate() {
    let engine = TestEngineBuilder::new().build();
    let (doc, tasks) = submitted_document(&engine, "Cahier des charges", &["v1"]).await;
    engine.mark_in_progress(doc.document_id).await.unwrap();

    let outcome = engine
        .decide(tasks[0].workflow_task_id, Decision::Approved, None)
        .await
        .unwrap();
    assert_eq!(outcome.previous_status, DocumentStatus::InProgress);
    assert_eq!(outcome.document.status, DocumentStatus::Validated);
}
