//! User statistics over stored workflows

use super::common::*;
use chrono::Duration;
use workflow_coach::{Database, Trend};
use workflow_coach_sdk::{Workflow, WorkflowStatus, WorkflowType};

/// Insert workflows oldest first, one minute apart
fn insert_history(db: &Database, history: &[(WorkflowType, Option<u8>)]) {
    for (i, (workflow_type, score)) in history.iter().enumerate() {
        let mut wf = Workflow::new(
            "user-1",
            format!("s-{}", i),
            *workflow_type,
            start_time() + Duration::minutes(i as i64),
        );
        wf.efficiency_score = *score;
        db.insert_workflow(&wf).unwrap();
    }
}

#[tokio::test]
async fn test_stats_for_new_user() {
    let (service, _db) = service_with(None);
    let stats = service.get_user_stats("nobody").await.unwrap();

    assert_eq!(stats.total_workflows, 0);
    assert_eq!(stats.completed_workflows, 0);
    assert_eq!(stats.average_efficiency, 0.0);
    assert_eq!(stats.most_common_type, None);
    assert_eq!(stats.total_time_spent_sec, 0);
    assert_eq!(stats.improvement_trend, Trend::Stable);
    service.shutdown().await;
}

#[tokio::test]
async fn test_improving_trend() {
    let (service, db) = service_with(None);
    let mut history = vec![(WorkflowType::Coding, Some(50)); 5];
    history.extend(vec![(WorkflowType::Writing, Some(80)); 5]);
    insert_history(&db, &history);

    let stats = service.get_user_stats("user-1").await.unwrap();
    assert_eq!(stats.total_workflows, 10);
    assert_eq!(stats.average_efficiency, 65.0);
    assert_eq!(stats.improvement_trend, Trend::Improving);
    // Tie between coding and writing goes to the most recent
    assert_eq!(stats.most_common_type, Some(WorkflowType::Writing));
    service.shutdown().await;
}

#[tokio::test]
async fn test_declining_trend() {
    let (service, db) = service_with(None);
    let mut history = vec![(WorkflowType::Research, Some(90)); 5];
    history.extend(vec![(WorkflowType::Research, Some(70)); 5]);
    insert_history(&db, &history);

    let stats = service.get_user_stats("user-1").await.unwrap();
    assert_eq!(stats.improvement_trend, Trend::Declining);
    service.shutdown().await;
}

#[tokio::test]
async fn test_window_is_fifty_most_recent() {
    let (service, db) = service_with(None);
    let history = vec![(WorkflowType::Analysis, Some(60)); 55];
    insert_history(&db, &history);

    let stats = service.get_user_stats("user-1").await.unwrap();
    assert_eq!(stats.total_workflows, 50);
    service.shutdown().await;
}

#[tokio::test]
async fn test_recorded_activity_counts_toward_stats() {
    let (service, db) = service_with(None);

    let id = service
        .record_activity("user-1", "s-1", command_event("review PR"))
        .await
        .unwrap();
    service.complete_workflow(id).await.unwrap();
    service
        .record_activity("user-1", "s-1", command_event("review docs"))
        .await
        .unwrap();
    service.analyze_now(id).await.unwrap();

    let stats = service.get_user_stats("user-1").await.unwrap();
    assert_eq!(stats.total_workflows, 2);
    assert_eq!(stats.completed_workflows, 1);
    assert_eq!(stats.most_common_type, Some(WorkflowType::Analysis));
    assert_eq!(
        db.get_workflow(&id).unwrap().unwrap().status,
        WorkflowStatus::Completed
    );
    service.shutdown().await;
}
