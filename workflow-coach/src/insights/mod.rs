//! Insight synthesis from workflow analyses
//!
//! Rule-based insights are always produced; every applicable rule fires
//! independently. When an [`InsightAugmenter`] is configured, a summary of the
//! analysis is sent to it and up to three supplementary insights are parsed
//! from the answer. Augmentation failures of any kind (timeout, transport,
//! malformed response) are logged and yield no additional insights.

pub mod augment;
pub mod parser;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use workflow_coach_sdk::{
    CoachInsight, ComplexityLevel, Difficulty, InsightAugmenter, InsightCategory,
    InsightRecommendation, InsightType, Priority, Workflow, WorkflowAnalysis, WorkflowPattern,
};

pub use augment::{AugmentationConfig, HttpInsightAugmenter};
pub use parser::parse_augmented_insights;

/// Insights are raised for workflows scoring below this
pub const LOW_EFFICIENCY_THRESHOLD: u8 = 60;
/// Bottlenecks turned into recommendations per insight
const MAX_BOTTLENECK_RECOMMENDATIONS: usize = 2;

pub struct InsightSynthesizer {
    augmenter: Option<Arc<dyn InsightAugmenter>>,
    timeout: Duration,
}

impl InsightSynthesizer {
    /// Synthesizer producing rule-based insights only
    pub fn new() -> Self {
        Self {
            augmenter: None,
            timeout: Duration::from_secs(20),
        }
    }

    /// Synthesizer that also asks `augmenter` for supplementary insights
    pub fn with_augmenter(augmenter: Arc<dyn InsightAugmenter>, timeout: Duration) -> Self {
        Self {
            augmenter: Some(augmenter),
            timeout,
        }
    }

    /// Produce coaching insights for one analyzed workflow
    pub async fn synthesize(
        &self,
        user_id: &str,
        analysis: &WorkflowAnalysis,
        workflow: &Workflow,
        patterns: &[WorkflowPattern],
    ) -> Vec<CoachInsight> {
        let mut insights = rule_based_insights(analysis, patterns);

        if let Some(augmenter) = &self.augmenter {
            let extra = self
                .augmented_insights(augmenter.as_ref(), analysis, workflow)
                .await;
            debug!(
                user_id = %user_id,
                workflow_id = %workflow.id,
                count = extra.len(),
                "Augmented insights added"
            );
            insights.extend(extra);
        }

        insights
    }

    async fn augmented_insights(
        &self,
        augmenter: &dyn InsightAugmenter,
        analysis: &WorkflowAnalysis,
        workflow: &Workflow,
    ) -> Vec<CoachInsight> {
        let summary = analysis_summary(analysis, workflow);

        let response = match tokio::time::timeout(self.timeout, augmenter.augment(&summary)).await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(workflow_id = %workflow.id, error = %e, "Insight augmentation failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(
                    workflow_id = %workflow.id,
                    timeout_secs = self.timeout.as_secs(),
                    "Insight augmentation timed out"
                );
                return Vec::new();
            }
        };

        match parse_augmented_insights(&response) {
            Ok(insights) => insights,
            Err(e) => {
                warn!(workflow_id = %workflow.id, error = %e, "Discarding augmentation response");
                Vec::new()
            }
        }
    }
}

impl Default for InsightSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply every insight rule to an analysis
pub fn rule_based_insights(
    analysis: &WorkflowAnalysis,
    patterns: &[WorkflowPattern],
) -> Vec<CoachInsight> {
    let mut insights = Vec::new();

    if analysis.efficiency_score < LOW_EFFICIENCY_THRESHOLD {
        insights.push(efficiency_insight(analysis));
    }

    if let Some(rec) = analysis.model_recommendations.first() {
        insights.push(CoachInsight {
            insight_type: InsightType::ModelOptimization,
            category: InsightCategory::Tactical,
            title: format!("Try {} instead of {}", rec.recommended_model, rec.current_model),
            description: rec.reason.clone(),
            recommendations: vec![InsightRecommendation {
                action: format!(
                    "Switch from {} to {} for this kind of work",
                    rec.current_model, rec.recommended_model
                ),
                expected_improvement: format!(
                    "About {}% higher success rate",
                    rec.expected_improvement_pct
                ),
                difficulty: Difficulty::Easy,
            }],
            priority: Priority::Medium,
        });
    }

    if !analysis.bottlenecks.is_empty() {
        insights.push(CoachInsight {
            insight_type: InsightType::BottleneckResolution,
            category: InsightCategory::Operational,
            title: "Workflow bottlenecks detected".to_string(),
            description: format!(
                "{} bottleneck(s) slowed this workflow down.",
                analysis.bottlenecks.len()
            ),
            recommendations: analysis
                .bottlenecks
                .iter()
                .take(MAX_BOTTLENECK_RECOMMENDATIONS)
                .map(|b| InsightRecommendation {
                    action: format!("Address: {}", b),
                    expected_improvement: "Fewer retries and faster completion".to_string(),
                    difficulty: Difficulty::Medium,
                })
                .collect(),
            priority: Priority::Medium,
        });
    }

    if analysis.complexity_assessment.level == ComplexityLevel::Expert {
        insights.push(CoachInsight {
            insight_type: InsightType::ComplexityManagement,
            category: InsightCategory::Strategic,
            title: "Expert-level complexity".to_string(),
            description: format!(
                "This workflow is highly complex: {}.",
                analysis.complexity_assessment.factors.join(", ")
            ),
            recommendations: vec![
                InsightRecommendation {
                    action: "Break the work into a roadmap of smaller milestones".to_string(),
                    expected_improvement: "Clearer progress and fewer context switches"
                        .to_string(),
                    difficulty: Difficulty::Medium,
                },
                InsightRecommendation {
                    action: "Add automated tests to catch regressions early".to_string(),
                    expected_improvement: "Fewer failed iterations".to_string(),
                    difficulty: Difficulty::Hard,
                },
            ],
            priority: Priority::High,
        });
    }

    if let Some(pattern) = most_frequent(patterns) {
        insights.push(CoachInsight {
            insight_type: InsightType::PatternRecognition,
            category: InsightCategory::Tactical,
            title: format!("Recurring pattern: {}", pattern.pattern_name),
            description: format!(
                "You have followed the '{}' pattern {} times.",
                pattern.pattern_name, pattern.frequency
            ),
            recommendations: vec![InsightRecommendation {
                action: format!(
                    "Turn '{}' into a reusable template or script",
                    pattern.pattern_name
                ),
                expected_improvement: "Less setup time for recurring work".to_string(),
                difficulty: Difficulty::Easy,
            }],
            priority: Priority::Low,
        });
    }

    insights
}

fn efficiency_insight(analysis: &WorkflowAnalysis) -> CoachInsight {
    let minutes_saved = analysis.time_analysis.idle_time_sec / 60;
    CoachInsight {
        insight_type: InsightType::EfficiencyImprovement,
        category: InsightCategory::Strategic,
        title: "Workflow efficiency below target".to_string(),
        description: format!(
            "This {} workflow scored {}/100 on efficiency.",
            analysis.workflow_type, analysis.efficiency_score
        ),
        recommendations: vec![
            InsightRecommendation {
                action: "Prepare context and prompts up front to cut idle time between steps"
                    .to_string(),
                expected_improvement: format!("Save about {} minutes per workflow", minutes_saved),
                difficulty: Difficulty::Medium,
            },
            InsightRecommendation {
                action: "Split the work into smaller sessions with one clear goal each"
                    .to_string(),
                expected_improvement: "10-20% higher efficiency score".to_string(),
                difficulty: Difficulty::Easy,
            },
        ],
        priority: Priority::High,
    }
}

/// Highest-frequency pattern; the earliest one wins ties
fn most_frequent(patterns: &[WorkflowPattern]) -> Option<&WorkflowPattern> {
    patterns.iter().fold(None, |best: Option<&WorkflowPattern>, p| match best {
        Some(b) if b.frequency >= p.frequency => Some(b),
        _ => Some(p),
    })
}

/// Natural-language summary sent to the augmentation service
pub fn analysis_summary(analysis: &WorkflowAnalysis, workflow: &Workflow) -> String {
    let time = &analysis.time_analysis;
    let bottlenecks = if analysis.bottlenecks.is_empty() {
        "none".to_string()
    } else {
        analysis.bottlenecks.join("; ")
    };
    let factors = if analysis.complexity_assessment.factors.is_empty() {
        String::new()
    } else {
        format!(" ({})", analysis.complexity_assessment.factors.join(", "))
    };

    format!(
        r#"Workflow type: {}
Efficiency score: {}/100
Complexity: {}{}
Bottlenecks: {}
Time: total {}s, active {}s, idle {}s, average step {}s
Steps: {}, model switches: {}

Suggest 2-3 strategic coaching insights for this user. Respond with a JSON array only.
Each element must have: type, category (strategic|tactical|operational), title, description,
recommendations (array of {{action, expected_improvement, difficulty: easy|medium|hard}}),
priority (low|medium|high|urgent)."#,
        analysis.workflow_type,
        analysis.efficiency_score,
        analysis.complexity_assessment.level,
        factors,
        bottlenecks,
        time.total_time_sec,
        time.active_time_sec,
        time.idle_time_sec,
        time.avg_step_time_sec,
        workflow.command_sequence.len(),
        workflow.model_switch_patterns.len(),
    )
}
