//! Per-user workflow statistics

use crate::analysis::analyze_time;
use crate::error::CoachResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use workflow_coach_sdk::{Workflow, WorkflowRepository, WorkflowStatus, WorkflowType};

/// Workflows considered per user
pub const STATS_WINDOW: usize = 50;
/// Size of each group compared for the trend
const TREND_GROUP: usize = 5;
/// Mean efficiency difference that counts as a trend
const TREND_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_workflows: usize,
    pub completed_workflows: usize,
    /// Mean efficiency of analyzed workflows, 0 when none are analyzed
    pub average_efficiency: f64,
    pub most_common_type: Option<WorkflowType>,
    pub total_time_spent_sec: u64,
    pub improvement_trend: Trend,
}

pub struct WorkflowStatsAggregator {
    repository: Arc<dyn WorkflowRepository>,
}

impl WorkflowStatsAggregator {
    pub fn new(repository: Arc<dyn WorkflowRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_user_stats(&self, user_id: &str) -> CoachResult<UserStats> {
        let workflows = self
            .repository
            .list_user_workflows(user_id, STATS_WINDOW)
            .await?;
        Ok(summarize(&workflows))
    }
}

/// Summarize workflows ordered newest first
pub fn summarize(workflows: &[Workflow]) -> UserStats {
    UserStats {
        total_workflows: workflows.len(),
        completed_workflows: workflows
            .iter()
            .filter(|w| w.status == WorkflowStatus::Completed)
            .count(),
        average_efficiency: mean_efficiency(workflows).unwrap_or(0.0),
        most_common_type: most_common_type(workflows),
        total_time_spent_sec: workflows
            .iter()
            .map(|w| analyze_time(&w.command_sequence).total_time_sec)
            .sum(),
        improvement_trend: improvement_trend(workflows),
    }
}

fn mean_efficiency(workflows: &[Workflow]) -> Option<f64> {
    let scores: Vec<f64> = workflows
        .iter()
        .filter_map(|w| w.efficiency_score)
        .map(f64::from)
        .collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Mode of the workflow types; ties go to the most recently used type
fn most_common_type(workflows: &[Workflow]) -> Option<WorkflowType> {
    let mut counts: HashMap<WorkflowType, usize> = HashMap::new();
    for w in workflows {
        *counts.entry(w.workflow_type).or_default() += 1;
    }

    let mut best: Option<(WorkflowType, usize)> = None;
    for w in workflows {
        let count = counts[&w.workflow_type];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((w.workflow_type, count));
        }
    }
    best.map(|(t, _)| t)
}

/// Compare the five most recent workflows against the five before them
pub fn improvement_trend(workflows: &[Workflow]) -> Trend {
    if workflows.len() < TREND_GROUP {
        return Trend::Stable;
    }

    let recent = &workflows[..TREND_GROUP];
    let older = &workflows[TREND_GROUP..workflows.len().min(TREND_GROUP * 2)];

    match (mean_efficiency(recent), mean_efficiency(older)) {
        (Some(recent), Some(older)) => {
            let diff = recent - older;
            if diff > TREND_THRESHOLD {
                Trend::Improving
            } else if diff < -TREND_THRESHOLD {
                Trend::Declining
            } else {
                Trend::Stable
            }
        }
        _ => Trend::Stable,
    }
}
