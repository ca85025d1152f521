//! Per-model success tracking and model recommendations

use std::collections::BTreeMap;
use workflow_coach_sdk::{ModelRecommendation, Workflow};

use super::ModelCatalog;

/// Models succeeding less often than this get a recommendation
pub const SUCCESS_RATE_THRESHOLD: f64 = 0.70;
/// Fixed heuristic improvement attached to every recommendation
pub const EXPECTED_IMPROVEMENT_PCT: u32 = 30;

const CODING_TERMS: &[&str] = &["code", "coding", "debug", "refactor"];
const REASONING_TERMS: &[&str] = &["analyze", "analysis", "review"];

#[derive(Debug, Default, Clone, Copy)]
struct ModelTally {
    total: usize,
    successes: usize,
}

impl ModelTally {
    fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.successes as f64 / self.total as f64
    }
}

/// Recommend replacements for models with a success rate below threshold
///
/// Commands without a recorded model are ignored. Results are ordered by
/// model name.
pub fn recommend_models(workflow: &Workflow, catalog: &ModelCatalog) -> Vec<ModelRecommendation> {
    let mut tallies: BTreeMap<&str, ModelTally> = BTreeMap::new();
    for c in &workflow.command_sequence {
        if let Some(model) = c.model_used.as_deref() {
            let tally = tallies.entry(model).or_default();
            tally.total += 1;
            if c.success {
                tally.successes += 1;
            }
        }
    }

    let target = target_model(workflow, catalog);

    tallies
        .into_iter()
        .filter(|(_, tally)| tally.success_rate() < SUCCESS_RATE_THRESHOLD)
        .map(|(model, tally)| ModelRecommendation {
            current_model: model.to_string(),
            recommended_model: target.to_string(),
            reason: format!(
                "{} succeeded on {:.0}% of {} steps",
                model,
                tally.success_rate() * 100.0,
                tally.total
            ),
            expected_improvement_pct: EXPECTED_IMPROVEMENT_PCT,
        })
        .collect()
}

/// Pick the model family matching what the workflow talks about
fn target_model<'a>(workflow: &Workflow, catalog: &'a ModelCatalog) -> &'a str {
    let mut text = workflow.workflow_type.as_str().to_string();
    for c in &workflow.command_sequence {
        text.push(' ');
        text.push_str(&c.command.to_lowercase());
    }

    if CODING_TERMS.iter().any(|t| text.contains(t)) {
        &catalog.coding
    } else if REASONING_TERMS.iter().any(|t| text.contains(t)) {
        &catalog.reasoning
    } else {
        &catalog.general
    }
}
