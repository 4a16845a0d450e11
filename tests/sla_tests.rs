//! Overdue reporting for pending validator tasks

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::*;
use docflow_core::lifecycle_events;
use docflow_core::models::NewDocument;
use docflow_core::orchestration::Decision;

#[tokio::test]
async fn test_sweep_skips_decided_paused_and_closed_work() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = TestEngineBuilder::new().with_notifier(notifier.clone()).build();

    // One open task remains here
    let (_, open) = submitted_document(&engine, "Ouvert", &["a", "b"]).await;
    engine
        .decide(open[0].workflow_task_id, Decision::Approved, None)
        .await
        .unwrap();

    // Paused on a dependency: the validator is waiting, not late
    let (_, paused) = submitted_document(&engine, "Demande de Travaux", &["c"]).await;
    engine
        .initiate_linked_document(
            paused[0].workflow_task_id,
            NewDocument::new("Annexe", "Travaux"),
        )
        .await
        .unwrap();

    // Rejected: leftover pending tasks are audit only
    let (_, closed) = submitted_document(&engine, "Clos", &["d", "e"]).await;
    engine
        .decide(closed[0].workflow_task_id, Decision::Rejected, None)
        .await
        .unwrap();

    let mut events = engine.subscribe();
    let monitor = engine.sla_monitor(Duration::minutes(30));
    let overdue = monitor.sweep(Utc::now() + Duration::hours(1)).await.unwrap();

    let ids: Vec<_> = overdue.iter().map(|t| t.workflow_task_id).collect();
    assert_eq!(ids, vec![open[1].workflow_task_id]);
    assert_eq!(
        notifier.calls().last(),
        Some(&Notification::Overdue(open[1].workflow_task_id))
    );

    let event = events.try_recv().unwrap();
    assert_eq!(event.name, lifecycle_events::TASK_OVERDUE);
    assert!(event.field("overdue_seconds").unwrap().as_i64().unwrap() >= 3600);
}

#[tokio::test]
async fn test_sweep_ignores_tasks_left_pending_by_superseded_rounds() {
    let engine = TestEngineBuilder::new().build();
    let (doc, first_round) = submitted_document(&engine, "Convention", &["a", "b"]).await;
    engine
        .decide(first_round[0].workflow_task_id, Decision::Rejected, None)
        .await
        .unwrap();
    let second_round = engine
        .submit_for_validation(doc.document_id, validators(&["a", "b"]))
        .await
        .unwrap();

    let overdue = engine
        .sla_monitor(Duration::minutes(30))
        .sweep(Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    // Round 1 still holds b's pending task, but only round 2 is actionable
    let mut ids: Vec<_> = overdue.iter().map(|t| t.workflow_task_id).collect();
    ids.sort();
    let mut expected: Vec<_> = second_round.iter().map(|t| t.workflow_task_id).collect();
    expected.sort();
    assert_eq!(ids, expected);
    assert!(overdue.iter().all(|t| t.round == 2));
}

#[tokio::test]
async fn test_sweep_completes_when_overdue_hook_hangs() {
    let engine = TestEngineBuilder::new()
        .with_notifier(Arc::new(HangingNotifier))
        .with_notification_timeout(std::time::Duration::from_millis(50))
        .build();
    submitted_document(&engine, "Relevé", &["a"]).await;

    let monitor = engine.sla_monitor(Duration::minutes(30));
    let sweep = monitor.sweep(Utc::now() + Duration::hours(1));
    let overdue = tokio::time::timeout(std::time::Duration::from_secs(2), sweep)
        .await
        .expect("sweep returned while on_task_overdue hangs")
        .unwrap();
    assert_eq!(overdue.len(), 1);
}
