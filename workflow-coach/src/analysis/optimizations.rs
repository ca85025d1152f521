//! Heuristic optimization suggestions

use workflow_coach_sdk::{Command, Workflow};

const MODEL_SWITCH_THRESHOLD: usize = 3;
const BATCHING_RUN_LENGTH: usize = 3;

pub const CONSISTENCY_SUGGESTION: &str =
    "Frequent model switching detected: settle on one model per task type to keep context consistent";
pub const BATCHING_SUGGESTION: &str =
    "Repeated consecutive commands detected: batch similar operations into a single request";
pub const REORDERING_SUGGESTION: &str =
    "Back-and-forth command pattern detected: reorder steps to finish one activity before switching";

/// Suggest optimizations for a workflow (non-exhaustive)
pub fn suggest_optimizations(workflow: &Workflow) -> Vec<String> {
    let mut optimizations = Vec::new();

    if workflow.model_switch_patterns.len() > MODEL_SWITCH_THRESHOLD {
        optimizations.push(CONSISTENCY_SUGGESTION.to_string());
    }

    if max_consecutive_similar(&workflow.command_sequence) >= BATCHING_RUN_LENGTH {
        optimizations.push(BATCHING_SUGGESTION.to_string());
    }

    if has_back_and_forth(&workflow.command_sequence) {
        optimizations.push(REORDERING_SUGGESTION.to_string());
    }

    optimizations
}

/// Length of the longest run of identical consecutive commands
pub fn max_consecutive_similar(commands: &[Command]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<&str> = None;

    for c in commands {
        if previous == Some(c.command.as_str()) {
            current += 1;
        } else {
            current = 1;
            previous = Some(c.command.as_str());
        }
        longest = longest.max(current);
    }

    longest
}

/// Whether an A-B-A pattern occurs anywhere in the sequence
pub fn has_back_and_forth(commands: &[Command]) -> bool {
    commands
        .windows(3)
        .any(|w| w[2].command == w[0].command && w[2].command != w[1].command)
}
