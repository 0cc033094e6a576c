//! Prompts and response parsing for generation-service providers.
//!
//! The system prompt asks the model for a single JSON object using the
//! canonical field names. Models do not always comply, so the parser
//! accepts either:
//! 1. A JSON object embedded anywhere in the reply (alias table applies)
//! 2. `Label: number` lines naming all three categories

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

use ideascore_core::{AnalysisRequest, AnalysisResult, Category, ScoreBreakdown};

use crate::providers::response::parse_document;
use crate::providers::ProviderError;

/// System prompt for idea analysis.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"
You are an analyst scoring a single idea against an organization's domain context.

Score three categories, each bounded:
- mission_alignment: 0.0 to 4.0. How directly the idea advances the stated goals.
- anti_challenge: 0.0 to 3.5. How well the idea avoids the listed anti-patterns.
  3.5 means no anti-pattern is involved.
- strategic_fit: 0.0 to 2.5. How well the idea fits the declared strategies.

## Output Format (JSON)
{
  "mission_alignment": number,
  "anti_challenge": number,
  "strategic_fit": number,
  "explanations": {
    "mission_alignment": "one sentence",
    "anti_challenge": "one sentence",
    "strategic_fit": "one sentence"
  }
}

Respond with the JSON object only. Never exceed a category bound.
"#;

lazy_static! {
    static ref SCORE_LINE: Regex = Regex::new(
        r"(?im)^[\s*#>-]*(mission[ _-]?alignment|anti[ _-]?challenge|strategic[ _-]?fit)\**\s*[:=]\s*\**\s*(-?\d+(?:\.\d+)?)"
    )
    .unwrap();
}

/// Build the user prompt for one request.
pub fn build_analysis_prompt(request: &AnalysisRequest) -> String {
    let mut prompt = format!("## Idea\n{}\n", request.idea.trim());

    match &request.context {
        Some(context) if !context.is_empty() => {
            prompt.push_str("\n## Domain Context\n");
            prompt.push_str(&context.to_string());
        }
        _ => prompt.push_str("\n## Domain Context\n(none provided)\n"),
    }

    prompt
}

fn embedded_json(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(serde_json::Value::Object(doc)) => Some(doc),
        _ => None,
    }
}

fn category_from_label(label: &str) -> Option<Category> {
    let label = label.to_ascii_lowercase();
    if label.starts_with("mission") {
        Some(Category::MissionAlignment)
    } else if label.starts_with("anti") {
        Some(Category::AntiChallenge)
    } else if label.starts_with("strategic") {
        Some(Category::StrategicFit)
    } else {
        None
    }
}

/// Parse a free-form model reply into a result.
pub fn parse_analysis_response(text: &str) -> Result<AnalysisResult, ProviderError> {
    if let Some(doc) = embedded_json(text) {
        return parse_document(&doc);
    }

    let mut found: BTreeMap<Category, f64> = BTreeMap::new();
    for caps in SCORE_LINE.captures_iter(text) {
        let Some(category) = category_from_label(&caps[1]) else {
            continue;
        };
        let value: f64 = caps[2]
            .parse()
            .map_err(|_| ProviderError::Parse(format!("bad number for {}", category)))?;
        found.entry(category).or_insert(value);
    }

    if found.len() < Category::ALL.len() {
        let missing: Vec<&str> = Category::ALL
            .iter()
            .filter(|c| !found.contains_key(c))
            .map(|c| c.key())
            .collect();
        return Err(ProviderError::Parse(format!(
            "model reply is missing scores for: {}",
            missing.join(", ")
        )));
    }

    let get = |c: Category| found.get(&c).copied().unwrap_or(0.0);
    let scores = ScoreBreakdown::new(
        get(Category::MissionAlignment),
        get(Category::AntiChallenge),
        get(Category::StrategicFit),
    )?;

    let mut explanations = BTreeMap::new();
    explanations.insert("overall".to_string(), text.trim().to_string());

    Ok(AnalysisResult::from_scores(scores, explanations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideascore_core::{DomainContext, Recommendation};

    #[test]
    fn test_system_prompt_names_every_category() {
        for category in Category::ALL {
            assert!(ANALYSIS_SYSTEM_PROMPT.contains(category.key()));
        }
    }

    #[test]
    fn test_prompt_includes_context() {
        let request = AnalysisRequest::new("  Build a CLI  ")
            .with_context(DomainContext::new().with_goal("Reduce toil"));
        let prompt = build_analysis_prompt(&request);

        assert!(prompt.starts_with("## Idea\nBuild a CLI\n"));
        assert!(prompt.contains("Goals:\n- Reduce toil"));

        let bare = build_analysis_prompt(&AnalysisRequest::new("x"));
        assert!(bare.contains("(none provided)"));
    }

    #[test]
    fn test_parse_embedded_json() {
        let reply = r#"Sure! Here is my analysis:
```json
{"mission_alignment": 3.0, "anti_challenge": 3.0, "strategic_fit": 2.0,
 "explanations": {"mission_alignment": "direct"}}
```"#;
        let result = parse_analysis_response(reply).unwrap();
        assert_eq!(result.final_score, 8.0);
        assert_eq!(result.recommendation, Recommendation::StronglyPursue);
        assert_eq!(result.explanation("mission_alignment"), Some("direct"));
    }

    #[test]
    fn test_parse_label_lines() {
        let reply = "**Mission Alignment**: 2.5\n- Anti-challenge: 3\nStrategic fit = 1.5\n";
        let result = parse_analysis_response(reply).unwrap();
        assert_eq!(result.scores.mission_alignment, 2.5);
        assert_eq!(result.scores.anti_challenge, 3.0);
        assert_eq!(result.scores.strategic_fit, 1.5);
        assert_eq!(result.final_score, 7.0);
    }

    #[test]
    fn test_label_lines_summing_to_threshold() {
        let reply = "Mission alignment: 1.4\nAnti-challenge: 2.8\nStrategic fit: 1.8\n";
        let result = parse_analysis_response(reply).unwrap();
        assert_eq!(result.final_score, 6.0);
        assert_eq!(result.recommendation, Recommendation::Pursue);
    }

    #[test]
    fn test_parse_missing_category_fails() {
        let err = parse_analysis_response("Mission alignment: 3\nStrategic fit: 2").unwrap_err();
        match err {
            ProviderError::Parse(msg) => assert!(msg.contains("anti_challenge")),
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_out_of_range_fails_validation() {
        let err = parse_analysis_response(
            "mission_alignment: 9\nanti_challenge: 1\nstrategic_fit: 1",
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::Validation { .. }));
    }
}
