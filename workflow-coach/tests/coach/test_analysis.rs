//! Analysis engine properties on hand-built workflows

use super::common::*;
use chrono::Duration;
use workflow_coach::analysis::optimizations::{BATCHING_SUGGESTION, CONSISTENCY_SUGGESTION};
use workflow_coach::analysis::{analyze, max_consecutive_similar};
use workflow_coach_sdk::{ComplexityLevel, ModelSwitch, TimeAnalysis, WorkflowType};

#[test]
fn test_empty_sequence_is_simple_and_zeroed() {
    let analysis = analyze(&workflow_with(WorkflowType::General, vec![]));
    assert_eq!(analysis.time_analysis, TimeAnalysis::default());
    assert_eq!(analysis.complexity_assessment.level, ComplexityLevel::Simple);
}

#[test]
fn test_two_active_commands_score_full_efficiency() {
    let analysis = analyze(&workflow_with(
        WorkflowType::Coding,
        vec![
            command("edit", 0, Some(5000), true),
            command("test", 10, Some(5000), true),
        ],
    ));

    assert_eq!(analysis.time_analysis.total_time_sec, 10);
    assert_eq!(analysis.time_analysis.active_time_sec, 10);
    assert_eq!(analysis.time_analysis.idle_time_sec, 0);
    assert_eq!(analysis.efficiency_score, 100);
}

#[test]
fn test_failure_count_reported_as_bottleneck() {
    let commands = (0..6)
        .map(|i| command(&format!("step {}", i), i * 2, Some(1000), i % 2 == 0))
        .collect();
    let analysis = analyze(&workflow_with(WorkflowType::Coding, commands));

    assert!(analysis
        .bottlenecks
        .iter()
        .any(|b| b.contains("3 failed steps")));
}

#[test]
fn test_model_switches_suggest_consistency() {
    let mut wf = workflow_with(WorkflowType::Writing, vec![command("draft", 0, None, true)]);
    wf.model_switch_patterns = (0..4)
        .map(|i| ModelSwitch {
            from_model: "a".to_string(),
            to_model: "b".to_string(),
            reason: None,
            timestamp: start_time() + Duration::seconds(i),
        })
        .collect();

    let analysis = analyze(&wf);
    assert!(analysis
        .optimizations
        .iter()
        .any(|o| o == CONSISTENCY_SUGGESTION));
}

#[test]
fn test_repeated_command_suggests_batching() {
    let commands: Vec<_> = (0..4).map(|i| command("X", i, Some(100), true)).collect();
    assert_eq!(max_consecutive_similar(&commands), 4);

    let analysis = analyze(&workflow_with(WorkflowType::General, commands));
    assert!(analysis.optimizations.iter().any(|o| o == BATCHING_SUGGESTION));
}

#[test]
fn test_large_diverse_analysis_workflow_is_expert() {
    let commands = (0..25)
        .map(|i| command(&format!("query {}", i % 12), i, Some(500), true))
        .collect();
    let analysis = analyze(&workflow_with(WorkflowType::Analysis, commands));
    assert_eq!(analysis.complexity_assessment.level, ComplexityLevel::Expert);
}

#[test]
fn test_score_stays_in_range_for_mixed_inputs() {
    for failures in 0..8 {
        let commands = (0..8)
            .map(|i| command("run", i * 30, Some(200 * (i as u64 + 1)), i >= failures))
            .collect();
        let analysis = analyze(&workflow_with(WorkflowType::Refactoring, commands));
        assert!(analysis.efficiency_score <= 100);
    }
}

#[test]
fn test_analysis_is_idempotent() {
    let wf = workflow_with(
        WorkflowType::Research,
        vec![
            command("search docs", 0, Some(2000), true),
            command("search docs", 40, None, false),
            command("summarize", 95, Some(8000), true),
        ],
    );
    assert_eq!(analyze(&wf), analyze(&wf));
}
