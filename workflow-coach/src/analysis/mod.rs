//! Workflow analysis engine
//!
//! [`analyze`] is a pure function over a workflow snapshot: no I/O, no
//! clock, no shared state. Calling it twice on the same snapshot yields the
//! same [`WorkflowAnalysis`], so workflows can be analyzed in parallel.
//!
//! - **time**: total/active/idle/average step time
//! - **bottlenecks**: slow steps, repeated failures, over-repeated commands
//! - **optimizations**: model consistency, batching, reordering suggestions
//! - **model_usage**: per-model success rates and replacement recommendations
//! - **complexity**: step/variety/type scoring into a complexity level
//!
//! Empty workflows are handled by explicit guards: zero time breakdown,
//! `simple` complexity, no bottlenecks and an efficiency score of 100.

pub mod bottlenecks;
pub mod complexity;
pub mod model_usage;
pub mod optimizations;
pub mod time;

use serde::{Deserialize, Serialize};
use workflow_coach_sdk::{Command, Workflow, WorkflowAnalysis};

pub use bottlenecks::detect_bottlenecks;
pub use complexity::assess_complexity;
pub use model_usage::recommend_models;
pub use optimizations::{max_consecutive_similar, suggest_optimizations};
pub use time::{analyze_time, idle_ratio};

/// Maximum points idle time can take off the efficiency score
const MAX_IDLE_PENALTY: f64 = 30.0;
/// Points taken off per detected bottleneck
const BOTTLENECK_PENALTY: f64 = 5.0;

/// Target models for recommendations, by workflow focus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCatalog {
    /// Recommended for code/debug/refactor work
    pub coding: String,
    /// Recommended for analysis/review work
    pub reasoning: String,
    /// Recommended for everything else
    pub general: String,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            coding: "claude-3-5-sonnet".to_string(),
            reasoning: "claude-3-opus".to_string(),
            general: "gpt-4o".to_string(),
        }
    }
}

/// Analyze a workflow with the default model catalog
pub fn analyze(workflow: &Workflow) -> WorkflowAnalysis {
    analyze_with(workflow, &ModelCatalog::default())
}

/// Analyze a workflow, recommending models from `catalog`
pub fn analyze_with(workflow: &Workflow, catalog: &ModelCatalog) -> WorkflowAnalysis {
    let commands = &workflow.command_sequence;
    let time_analysis = analyze_time(commands);
    let bottlenecks = detect_bottlenecks(commands);
    let efficiency_score = efficiency_score(
        idle_ratio(commands),
        bottlenecks.len(),
        success_rate(commands),
    );

    WorkflowAnalysis {
        workflow_type: workflow.workflow_type,
        efficiency_score,
        optimizations: suggest_optimizations(workflow),
        model_recommendations: recommend_models(workflow, catalog),
        complexity_assessment: assess_complexity(workflow),
        time_analysis,
        bottlenecks,
    }
}

/// Fraction of successful commands; 1.0 for an empty sequence
pub fn success_rate(commands: &[Command]) -> f64 {
    if commands.is_empty() {
        return 1.0;
    }
    commands.iter().filter(|c| c.success).count() as f64 / commands.len() as f64
}

/// Composite 0-100 score from idle ratio, bottleneck count and success rate
pub fn efficiency_score(idle_ratio: f64, bottleneck_count: usize, success_rate: f64) -> u8 {
    let mut score = 100.0;
    score -= (idle_ratio * 100.0).min(MAX_IDLE_PENALTY);
    score -= BOTTLENECK_PENALTY * bottleneck_count as f64;
    score *= success_rate;

    score.clamp(0.0, 100.0).round() as u8
}
