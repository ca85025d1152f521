//! Complexity assessment

use std::collections::HashSet;
use workflow_coach_sdk::{ComplexityAssessment, ComplexityLevel, Workflow, WorkflowType};

/// Score a workflow's complexity from step count, command variety and type
///
/// Step and variety terms contribute 1-3 points each, inherently complex
/// workflow types add 2. Only terms above the baseline are listed as factors.
pub fn assess_complexity(workflow: &Workflow) -> ComplexityAssessment {
    let mut factors = Vec::new();
    let steps = workflow.command_sequence.len();
    let distinct = workflow
        .command_sequence
        .iter()
        .map(|c| c.command.as_str())
        .collect::<HashSet<_>>()
        .len();

    let step_term = match steps {
        n if n > 20 => 3,
        n if n > 10 => 2,
        _ => 1,
    };
    if step_term > 1 {
        factors.push(format!("High step count ({} steps)", steps));
    }

    let variety_term = match distinct {
        n if n > 10 => 3,
        n if n > 5 => 2,
        _ => 1,
    };
    if variety_term > 1 {
        factors.push(format!("Diverse command set ({} distinct commands)", distinct));
    }

    let type_term = if is_inherently_complex(workflow.workflow_type) {
        factors.push(format!(
            "Inherently complex workflow type ({})",
            workflow.workflow_type
        ));
        2
    } else {
        0
    };

    ComplexityAssessment {
        level: level_for_score(step_term + variety_term + type_term),
        factors,
    }
}

fn is_inherently_complex(workflow_type: WorkflowType) -> bool {
    matches!(
        workflow_type,
        WorkflowType::Refactoring | WorkflowType::Analysis
    )
}

fn level_for_score(score: u32) -> ComplexityLevel {
    match score {
        s if s >= 7 => ComplexityLevel::Expert,
        s if s >= 5 => ComplexityLevel::Complex,
        s if s >= 3 => ComplexityLevel::Moderate,
        _ => ComplexityLevel::Simple,
    }
}
