//! Insight lifecycle through the service

use super::common::*;
use chrono::{Duration, Utc};
use uuid::Uuid;
use workflow_coach::CoachError;
use workflow_coach_sdk::{
    CoachInsight, Feedback, InsightCategory, InsightType, Priority, StoredInsight, Workflow,
    WorkflowType,
};

fn stored(workflow_id: Uuid, title: &str, priority: Priority, age_days: i64) -> StoredInsight {
    let created_at = Utc::now() - Duration::days(age_days);
    StoredInsight {
        id: Uuid::new_v4(),
        user_id: "user-1".to_string(),
        workflow_id,
        insight: CoachInsight {
            insight_type: InsightType::EfficiencyImprovement,
            category: InsightCategory::Operational,
            title: title.to_string(),
            description: "d".to_string(),
            recommendations: Vec::new(),
            priority,
        },
        created_at,
        expires_at: created_at + Duration::days(7),
        was_shown: false,
        shown_at: None,
        user_feedback: None,
        feedback_details: None,
        was_acted_upon: false,
    }
}

#[tokio::test]
async fn test_pending_excludes_expired_and_shown() {
    let (service, db) = service_with(None);
    let wf = Workflow::new("user-1", "s-1", WorkflowType::General, Utc::now());
    db.insert_workflow(&wf).unwrap();

    let fresh = stored(wf.id, "fresh", Priority::Low, 0);
    let expired = stored(wf.id, "expired", Priority::Urgent, 8);
    let shown = stored(wf.id, "shown", Priority::High, 1);
    for insight in [&fresh, &expired, &shown] {
        db.insert_insight(insight).unwrap();
    }
    service.mark_shown(shown.id).await.unwrap();

    let pending = service.list_pending("user-1", 10).await.unwrap();
    let titles: Vec<_> = pending.iter().map(|i| i.insight.title.as_str()).collect();
    assert_eq!(titles, vec!["fresh"]);

    assert_eq!(service.purge_expired().await.unwrap(), 1);
    assert!(db.get_insight(&expired.id).unwrap().is_none());
    service.shutdown().await;
}

#[tokio::test]
async fn test_pending_respects_limit_and_recency() {
    let (service, db) = service_with(None);
    let wf = Workflow::new("user-1", "s-1", WorkflowType::General, Utc::now());
    db.insert_workflow(&wf).unwrap();

    let older = stored(wf.id, "older", Priority::Medium, 2);
    let newer = stored(wf.id, "newer", Priority::Medium, 1);
    db.insert_insight(&older).unwrap();
    db.insert_insight(&newer).unwrap();

    let pending = service.list_pending("user-1", 1).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].insight.title, "newer");
    service.shutdown().await;
}

#[tokio::test]
async fn test_feedback_round_trip() {
    let (service, db) = service_with(None);
    let wf = Workflow::new("user-1", "s-1", WorkflowType::General, Utc::now());
    db.insert_workflow(&wf).unwrap();
    let insight = stored(wf.id, "try it", Priority::High, 0);
    db.insert_insight(&insight).unwrap();

    service
        .record_feedback(insight.id, Feedback::Positive, Some("saved me an hour"))
        .await
        .unwrap();
    let loaded = db.get_insight(&insight.id).unwrap().unwrap();
    assert!(loaded.was_acted_upon);
    assert_eq!(loaded.user_feedback, Some(Feedback::Positive));

    service
        .record_feedback(insight.id, Feedback::Neutral, None)
        .await
        .unwrap();
    let loaded = db.get_insight(&insight.id).unwrap().unwrap();
    assert!(!loaded.was_acted_upon);
    assert_eq!(loaded.feedback_details, None);
    service.shutdown().await;
}

#[tokio::test]
async fn test_operations_on_missing_insight_are_not_found() {
    let (service, _db) = service_with(None);
    let id = Uuid::new_v4();

    assert!(matches!(
        service.mark_shown(id).await,
        Err(CoachError::InsightNotFound(missing)) if missing == id
    ));
    assert!(matches!(
        service.record_feedback(id, Feedback::Negative, Some("meh")).await,
        Err(CoachError::InsightNotFound(missing)) if missing == id
    ));
    service.shutdown().await;
}
