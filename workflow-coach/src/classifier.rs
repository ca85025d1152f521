//! Activity classification into workflow types

use workflow_coach_sdk::WorkflowType;

/// Keyword rules, checked in order; the first matching rule wins
const RULES: &[(&[&str], WorkflowType)] = &[
    (&["code", "debug"], WorkflowType::Coding),
    (&["analyze", "review"], WorkflowType::Analysis),
    (&["write", "document"], WorkflowType::Writing),
    (&["research", "search"], WorkflowType::Research),
    (&["refactor"], WorkflowType::Refactoring),
];

/// Map a raw activity label to a workflow type
pub fn classify(label: &str) -> WorkflowType {
    let label = label.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| label.contains(k)))
        .map(|(_, workflow_type)| *workflow_type)
        .unwrap_or(WorkflowType::General)
}
