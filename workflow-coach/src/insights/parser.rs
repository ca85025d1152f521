//! Strict parsing of augmentation service responses
//!
//! The service answers in free text that should contain a JSON array of
//! insights. The search is narrowed to a ```json or generic fence when one
//! is present, then each `[` is tried in turn until one starts an array of
//! insights. Every entry of that array is validated and any failure rejects
//! the whole response.

use serde::Deserialize;
use thiserror::Error;
use workflow_coach_sdk::{
    CoachInsight, Difficulty, InsightCategory, InsightRecommendation, InsightType, Priority,
};

/// Upper bound on supplementary insights taken from one response
pub const MAX_AUGMENTED_INSIGHTS: usize = 3;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("No JSON array found in response")]
    NoJsonArray,

    #[error("Invalid insight JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Insight {index} is invalid: {reason}")]
    Invalid { index: usize, reason: String },

    #[error("Response contained no insights")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    action: String,
    #[serde(alias = "expectedImprovement")]
    expected_improvement: String,
    difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
struct RawInsight {
    #[serde(rename = "type")]
    insight_type: InsightType,
    category: InsightCategory,
    title: String,
    description: String,
    recommendations: Vec<RawRecommendation>,
    priority: Priority,
}

fn fenced_block<'a>(text: &'a str, fence: &str) -> Option<&'a str> {
    let start = text.find(fence)? + fence.len();
    let rest = &text[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Find the first non-empty insight array in a free-text response
///
/// Brackets in surrounding prose (`see [1]`) are skipped. When no candidate
/// yields insights, the first deserialization error is reported.
fn find_insight_array(text: &str) -> Result<Vec<RawInsight>, ParseError> {
    let body = fenced_block(text, "```json")
        .or_else(|| fenced_block(text, "```"))
        .unwrap_or(text);

    let mut first_error = None;
    let mut saw_empty = false;
    for (start, _) in body.match_indices('[') {
        let mut stream =
            serde_json::Deserializer::from_str(&body[start..]).into_iter::<Vec<RawInsight>>();
        match stream.next() {
            Some(Ok(raw)) => {
                if !raw.is_empty() {
                    return Ok(raw);
                }
                saw_empty = true;
            }
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }

    match first_error {
        Some(e) => Err(ParseError::Json(e)),
        None if saw_empty => Err(ParseError::Empty),
        None => Err(ParseError::NoJsonArray),
    }
}

/// Parse and validate augmented insights, keeping at most [`MAX_AUGMENTED_INSIGHTS`]
pub fn parse_augmented_insights(text: &str) -> Result<Vec<CoachInsight>, ParseError> {
    find_insight_array(text)?
        .into_iter()
        .take(MAX_AUGMENTED_INSIGHTS)
        .enumerate()
        .map(|(index, r)| validate(index, r))
        .collect()
}

fn validate(index: usize, raw: RawInsight) -> Result<CoachInsight, ParseError> {
    let invalid = |reason: &str| ParseError::Invalid {
        index,
        reason: reason.to_string(),
    };

    if raw.title.trim().is_empty() {
        return Err(invalid("empty title"));
    }
    if raw.description.trim().is_empty() {
        return Err(invalid("empty description"));
    }
    if raw.recommendations.iter().any(|r| r.action.trim().is_empty()) {
        return Err(invalid("recommendation without action"));
    }

    Ok(CoachInsight {
        insight_type: raw.insight_type,
        category: raw.category,
        title: raw.title.trim().to_string(),
        description: raw.description.trim().to_string(),
        recommendations: raw
            .recommendations
            .into_iter()
            .map(|r| InsightRecommendation {
                action: r.action,
                expected_improvement: r.expected_improvement,
                difficulty: r.difficulty,
            })
            .collect(),
        priority: raw.priority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"[
        {
            "type": "workflow_redesign",
            "category": "strategic",
            "title": "Plan before prompting",
            "description": "Sketch the task before opening a session.",
            "recommendations": [
                {"action": "Write a short plan", "expected_improvement": "10% fewer steps", "difficulty": "easy"}
            ],
            "priority": "high"
        }
    ]"#;

    #[test]
    fn test_parse_raw_array() {
        let insights = parse_augmented_insights(VALID).unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].insight_type, InsightType::StrategicAdvice);
        assert_eq!(insights[0].category, InsightCategory::Strategic);
        assert_eq!(insights[0].priority, Priority::High);
        assert_eq!(insights[0].recommendations[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_parse_fenced_response_with_prose() {
        let text = format!(
            "Here are some ideas:\n```json\n{}\n```\nHope this helps [really].",
            VALID
        );
        assert_eq!(parse_augmented_insights(&text).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_embedded_array_without_fence() {
        let text = format!("Sure! {} Let me know.", VALID);
        assert_eq!(parse_augmented_insights(&text).unwrap().len(), 1);
    }

    #[test]
    fn test_bracketed_prose_before_array() {
        let text = format!("See [1]: {} and [2].", VALID);
        let insights = parse_augmented_insights(&text).unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].title, "Plan before prompting");
    }

    #[test]
    fn test_bracketed_prose_without_array() {
        assert!(matches!(
            parse_augmented_insights("See [1] and [2] for details."),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_camel_case_expected_improvement_accepted() {
        let text = r#"[{"type":"x","category":"tactical","title":"t","description":"d",
            "recommendations":[{"action":"a","expectedImprovement":"e","difficulty":"hard"}],
            "priority":"low"}]"#;
        let insights = parse_augmented_insights(text).unwrap();
        assert_eq!(insights[0].recommendations[0].expected_improvement, "e");
    }

    #[test]
    fn test_caps_at_three() {
        let one = r#"{"type":"x","category":"strategic","title":"t","description":"d","recommendations":[],"priority":"medium"}"#;
        let text = format!("[{}]", vec![one; 5].join(","));
        assert_eq!(parse_augmented_insights(&text).unwrap().len(), 3);
    }

    #[test]
    fn test_malformed_responses_rejected() {
        assert!(matches!(
            parse_augmented_insights("no insights today"),
            Err(ParseError::NoJsonArray)
        ));
        assert!(matches!(parse_augmented_insights("[]"), Err(ParseError::Empty)));
        assert!(matches!(
            parse_augmented_insights("[{\"title\": \"missing fields\"}]"),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            parse_augmented_insights(
                r#"[{"type":"x","category":"cosmic","title":"t","description":"d","recommendations":[],"priority":"low"}]"#
            ),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            parse_augmented_insights(
                r#"[{"type":"x","category":"strategic","title":" ","description":"d","recommendations":[],"priority":"low"}]"#
            ),
            Err(ParseError::Invalid { index: 0, .. })
        ));
    }
}
