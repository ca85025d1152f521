//! Activity tracking through the service

use super::common::*;
use std::sync::Arc;
use workflow_coach::CoachError;
use workflow_coach_sdk::{ActivityEvent, WorkflowStatus, WorkflowType};

#[tokio::test]
async fn test_session_events_accumulate_on_one_workflow() {
    let (service, db) = service_with(None);

    let mut ids = Vec::new();
    for text in ["analyze crash logs", "open file", "rerun query"] {
        ids.push(
            service
                .record_activity("user-1", "s-1", command_event(text))
                .await,
        );
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    service.shutdown().await;

    let wf = db.find_active_workflow("user-1", "s-1").unwrap().unwrap();
    assert_eq!(wf.workflow_type, WorkflowType::Analysis);
    assert_eq!(wf.total_steps, 3);
    assert_eq!(wf.total_steps, wf.command_sequence.len());
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (service, _db) = service_with(None);

    let a = service
        .record_activity("user-1", "s-1", command_event("code"))
        .await;
    let b = service
        .record_activity("user-1", "s-2", command_event("code"))
        .await;
    let c = service
        .record_activity("user-2", "s-1", command_event("code"))
        .await;

    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_ne!(b, c);
    service.shutdown().await;
}

#[tokio::test]
async fn test_unknown_event_type_is_recorded_as_other() {
    let (service, db) = service_with(None);

    let event: ActivityEvent = serde_json::from_str(r#"{"type":"file_opened"}"#).unwrap();
    let id = service
        .record_activity("user-1", "s-1", event)
        .await
        .unwrap();
    service.shutdown().await;

    let wf = db.get_workflow(&id).unwrap().unwrap();
    assert_eq!(wf.workflow_type, WorkflowType::General);
    assert_eq!(wf.total_steps, 0);
}

#[tokio::test]
async fn test_complete_then_record_starts_new_workflow() {
    let (service, db) = service_with(None);

    let first = service
        .record_activity("user-1", "s-1", command_event("refactor auth"))
        .await
        .unwrap();
    service.complete_workflow(first).await.unwrap();
    let second = service
        .record_activity("user-1", "s-1", command_event("write changelog"))
        .await
        .unwrap();
    service.shutdown().await;

    assert_ne!(first, second);
    let old = db.get_workflow(&first).unwrap().unwrap();
    assert_eq!(old.status, WorkflowStatus::Completed);
    assert_eq!(old.workflow_type, WorkflowType::Refactoring);
    let new = db.get_workflow(&second).unwrap().unwrap();
    assert_eq!(new.status, WorkflowStatus::Active);
    assert_eq!(new.workflow_type, WorkflowType::Writing);
}

#[tokio::test]
async fn test_complete_unknown_workflow_is_not_found() {
    let (service, _db) = service_with(None);
    let result = service.complete_workflow(uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(CoachError::WorkflowNotFound(_))));
    service.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_lose_no_steps() {
    let (service, db) = service_with(None);
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for session in 0..4 {
        for step in 0..10 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .record_activity(
                        "user-1",
                        &format!("s-{}", session),
                        command_event(&format!("step {}", step)),
                    )
                    .await
            }));
        }
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    for session in 0..4 {
        let wf = db
            .find_active_workflow("user-1", &format!("s-{}", session))
            .unwrap()
            .unwrap();
        assert_eq!(wf.total_steps, 10);
    }

    if let Ok(service) = Arc::try_unwrap(service) {
        service.shutdown().await;
    }
}
