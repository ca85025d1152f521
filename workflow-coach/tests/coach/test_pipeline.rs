//! Background analysis and insight synthesis

use super::common::*;
use chrono::Utc;
use std::sync::Arc;
use workflow_coach::CoachError;
use workflow_coach_sdk::{InsightAugmenter, InsightType, Priority};

#[tokio::test]
async fn test_triggered_analysis_annotates_workflow_and_stores_insights() {
    let (service, db) = service_with(None);

    let mut workflow_id = None;
    for i in 0..5 {
        workflow_id = service
            .record_activity(
                "user-1",
                "s-1",
                failed_event(&format!("debug test {}", i), "weak-model"),
            )
            .await;
    }
    // Flush queued analyses
    service.shutdown().await;

    let wf = db.get_workflow(&workflow_id.unwrap()).unwrap().unwrap();
    assert!(wf.last_analyzed_at.is_some());
    assert_eq!(wf.efficiency_score, Some(0));
    let analysis = wf.analysis.unwrap();
    assert_eq!(analysis.model_recommendations[0].current_model, "weak-model");

    let pending = db.list_pending_insights("user-1", Utc::now(), 50).unwrap();
    let types: Vec<_> = pending.iter().map(|i| i.insight.insight_type).collect();
    assert!(types.contains(&InsightType::EfficiencyImprovement));
    assert!(types.contains(&InsightType::ModelOptimization));
    assert!(types.contains(&InsightType::BottleneckResolution));
    assert!(pending.iter().all(|i| i.workflow_id == wf.id));
}

#[tokio::test]
async fn test_analyze_now_returns_outcome() {
    let (service, _db) = service_with(None);

    let id = service
        .record_activity("user-1", "s-1", command_event("write report"))
        .await
        .unwrap();
    let outcome = service.analyze_now(id).await.unwrap();

    assert_eq!(outcome.workflow_id, id);
    assert_eq!(outcome.analysis.efficiency_score, 100);
    // Healthy single-step workflow raises no rule-based insight
    assert!(outcome.insights.is_empty());
    service.shutdown().await;
}

#[tokio::test]
async fn test_analyze_unknown_workflow() {
    let (service, _db) = service_with(None);
    let result = service.analyze_now(uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(CoachError::WorkflowNotFound(_))));
    service.shutdown().await;
}

#[tokio::test]
async fn test_patterns_feed_pattern_insight() {
    let (service, db) = service_with(None);
    db.record_pattern("user-1", "late-night debugging").unwrap();
    db.record_pattern("user-1", "late-night debugging").unwrap();
    db.record_pattern("user-1", "morning reviews").unwrap();

    let id = service
        .record_activity("user-1", "s-1", command_event("code"))
        .await
        .unwrap();
    let outcome = service.analyze_now(id).await.unwrap();

    let pattern = outcome
        .insights
        .iter()
        .find(|i| i.insight.insight_type == InsightType::PatternRecognition)
        .unwrap();
    assert!(pattern.insight.title.contains("late-night debugging"));
    service.shutdown().await;
}

#[tokio::test]
async fn test_augmented_insights_are_appended() {
    let augmenter = Arc::new(FakeAugmenter::responding(AUGMENTED_RESPONSE));
    let (service, _db) = service_with(Some(augmenter.clone() as Arc<dyn InsightAugmenter>));

    let id = service
        .record_activity("user-1", "s-1", failed_event("run tests", "m"))
        .await
        .unwrap();
    let outcome = service.analyze_now(id).await.unwrap();

    let last = outcome.insights.last().unwrap();
    assert_eq!(last.insight.title, "Batch related edits");
    assert_eq!(last.insight.priority, Priority::Urgent);
    assert!(outcome.insights.len() > 1);
    assert!(augmenter.call_count() >= 1);

    let pending = service.list_pending("user-1", 1).await.unwrap();
    assert_eq!(pending[0].insight.priority, Priority::Urgent);
    service.shutdown().await;
}

#[tokio::test]
async fn test_failing_augmenter_keeps_rule_insights() {
    let augmenter = Arc::new(FakeAugmenter::failing("service unavailable"));
    let (service, _db) = service_with(Some(augmenter.clone() as Arc<dyn InsightAugmenter>));

    let id = service
        .record_activity("user-1", "s-1", failed_event("run tests", "m"))
        .await
        .unwrap();
    let outcome = service.analyze_now(id).await.unwrap();

    assert!(!outcome.insights.is_empty());
    assert!(outcome
        .insights
        .iter()
        .all(|i| i.insight.title != "Batch related edits"));
    assert!(augmenter.call_count() >= 1);
    service.shutdown().await;
}

#[tokio::test]
async fn test_malformed_augmentation_adds_nothing() {
    let augmenter = Arc::new(FakeAugmenter::responding("I have no structured advice today."));
    let (service, _db) = service_with(Some(augmenter as Arc<dyn InsightAugmenter>));

    let id = service
        .record_activity("user-1", "s-1", command_event("write report"))
        .await
        .unwrap();
    let outcome = service.analyze_now(id).await.unwrap();

    assert!(outcome.insights.is_empty());
    service.shutdown().await;
}

#[tokio::test]
async fn test_event_burst_stores_one_set_of_insights() {
    let (service, db) = service_with(None);

    for i in 0..5 {
        service
            .record_activity(
                "user-1",
                "s-1",
                failed_event(&format!("debug test {}", i), "weak-model"),
            )
            .await;
    }
    service.shutdown().await;

    let pending = db.list_pending_insights("user-1", Utc::now(), 50).unwrap();
    let efficiency = pending
        .iter()
        .filter(|i| i.insight.insight_type == InsightType::EfficiencyImprovement)
        .count();
    assert_eq!(efficiency, 1);

    let mut titles: Vec<_> = pending.iter().map(|i| i.insight.title.as_str()).collect();
    let total = titles.len();
    titles.sort_unstable();
    titles.dedup();
    assert_eq!(titles.len(), total);
}
