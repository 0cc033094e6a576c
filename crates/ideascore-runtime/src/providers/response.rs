//! Flexible response parsing for HTTP-backed providers.
//!
//! Third-party services name their fields however they like. Each logical
//! field has an ordered list of accepted aliases; the first alias present
//! (and non-null) wins. Fields are looked up on the root object first, then
//! inside the common envelopes `result`, `data`, `scores` and `output`.
//!
//! A body that is not a JSON object falls back to a neutral midpoint result
//! carrying the raw text as its explanation.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use ideascore_core::{AnalysisResult, Category, Recommendation, ScoreBreakdown};

use super::ProviderError;

/// Logical fields extracted from a response document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Category(Category),
    FinalScore,
    Recommendation,
    Explanation,
}

/// Accepted key names per logical field, in probe order.
const ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Category(Category::MissionAlignment),
        &["mission_alignment", "missionAlignment", "mission", "alignment"],
    ),
    (
        Field::Category(Category::AntiChallenge),
        &["anti_challenge", "antiChallenge", "challenge"],
    ),
    (
        Field::Category(Category::StrategicFit),
        &["strategic_fit", "strategicFit", "fit"],
    ),
    (
        Field::FinalScore,
        &["final_score", "finalScore", "score", "total_score", "total"],
    ),
    (
        Field::Recommendation,
        &["recommendation", "verdict", "decision"],
    ),
    (
        Field::Explanation,
        &[
            "explanation",
            "explanations",
            "reasoning",
            "rationale",
            "summary",
            "analysis",
        ],
    ),
];

/// Nested objects searched after the root.
const ENVELOPES: &[&str] = &["result", "data", "scores", "output"];

fn aliases(field: Field) -> &'static [&'static str] {
    ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

/// Find the first non-null value for `field`.
fn lookup<'a>(doc: &'a Map<String, Value>, field: Field) -> Option<&'a Value> {
    let names = aliases(field);

    let scopes = std::iter::once(doc).chain(
        ENVELOPES
            .iter()
            .filter_map(|key| doc.get(*key).and_then(Value::as_object)),
    );

    for scope in scopes {
        for name in names {
            match scope.get(*name) {
                Some(Value::Null) | None => continue,
                Some(value) => return Some(value),
            }
        }
    }
    None
}

fn as_number(field: &str, value: &Value) -> Result<f64, ProviderError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ProviderError::Parse(format!("{} is not a finite number", field))),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            ProviderError::Parse(format!("{} is not numeric: {:?}", field, s))
        }),
        other => Err(ProviderError::Parse(format!(
            "{} has unexpected type: {}",
            field, other
        ))),
    }
}

fn collect_explanations(value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::String(s) => {
            out.insert("overall".to_string(), s.clone());
        }
        Value::Object(map) => {
            for (key, v) in map {
                if let Some(text) = v.as_str() {
                    out.insert(key.clone(), text.to_string());
                }
            }
        }
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            if !joined.is_empty() {
                out.insert("overall".to_string(), joined);
            }
        }
        _ => {}
    }
}

/// Parse a JSON object into a result.
///
/// Missing categories score zero, but a document with no recognized score
/// field at all is rejected. Category scores are validated against their
/// bounds. A final score that is absent or zero is recomputed as the sum.
pub fn parse_document(doc: &Map<String, Value>) -> Result<AnalysisResult, ProviderError> {
    let mut recognized = false;
    let mut values = [0.0; 3];

    for (slot, category) in Category::ALL.into_iter().enumerate() {
        if let Some(value) = lookup(doc, Field::Category(category)) {
            values[slot] = as_number(category.key(), value)?;
            recognized = true;
        }
    }

    let final_override = lookup(doc, Field::FinalScore)
        .map(|v| as_number("final_score", v))
        .transpose()?;

    if !recognized && final_override.is_none() {
        return Err(ProviderError::Parse(
            "response contains no recognized score fields".to_string(),
        ));
    }

    let scores = ScoreBreakdown::new(values[0], values[1], values[2])?;

    let mut explanations = BTreeMap::new();
    if let Some(value) = lookup(doc, Field::Explanation) {
        collect_explanations(value, &mut explanations);
    }

    let mut result = AnalysisResult::from_scores(scores, explanations);

    if let Some(score) = final_override.filter(|s| *s != 0.0) {
        if !score.is_finite() || !(0.0..=10.0).contains(&score) {
            return Err(ProviderError::Validation {
                field: "final_score".to_string(),
                value: score,
                max: 10.0,
            });
        }
        result.final_score = score;
        result.recommendation = Recommendation::from_score(score);
    }

    if let Some(label) = lookup(doc, Field::Recommendation).and_then(Value::as_str) {
        match Recommendation::parse_label(label) {
            Some(recommendation) => result.recommendation = recommendation,
            None => tracing::warn!(
                label = %label,
                derived = %result.recommendation,
                "Unknown recommendation label, deriving from score"
            ),
        }
    }

    Ok(result)
}

/// Neutral result for a body that could not be read as JSON.
pub fn text_fallback(body: &str) -> AnalysisResult {
    let mut explanations = BTreeMap::new();
    explanations.insert("overall".to_string(), body.trim().to_string());
    AnalysisResult::from_scores(ScoreBreakdown::midpoint(), explanations)
}

/// Parse a raw HTTP response body.
///
/// JSON objects go through [`parse_document`] and may fail validation.
/// Anything else takes the text fallback, which never fails.
pub fn parse_body(body: &str) -> Result<AnalysisResult, ProviderError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(doc)) => parse_document(&doc),
        _ => {
            tracing::debug!(bytes = body.len(), "Non-JSON response body, using text fallback");
            Ok(text_fallback(body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonical_fields() {
        let result = parse_body(
            r#"{"mission_alignment":3.5,"anti_challenge":2.8,"strategic_fit":2.0}"#,
        )
        .unwrap();

        assert!((result.final_score - 8.3).abs() < 1e-9);
        assert_eq!(result.recommendation, Recommendation::StronglyPursue);
        assert!(!result.from_cache);
    }

    #[test]
    fn test_sum_on_threshold_gets_higher_label() {
        let result = parse_body(
            r#"{"mission_alignment":2.8,"anti_challenge":3.4,"strategic_fit":1.8}"#,
        )
        .unwrap();

        assert_eq!(result.final_score, 8.0);
        assert_eq!(result.recommendation, Recommendation::StronglyPursue);
    }

    #[test]
    fn test_aliases_and_envelope() {
        let result = parse_body(
            r#"{"data": {"missionAlignment": "3", "challenge": 2, "fit": 1,
                "verdict": "Pursue", "reasoning": "solid"}}"#,
        )
        .unwrap();

        assert_eq!(result.scores.mission_alignment, 3.0);
        assert_eq!(result.scores.anti_challenge, 2.0);
        assert_eq!(result.scores.strategic_fit, 1.0);
        assert_eq!(result.final_score, 6.0);
        assert_eq!(result.recommendation, Recommendation::Pursue);
        assert_eq!(result.explanation("overall"), Some("solid"));
    }

    #[test]
    fn test_root_wins_over_envelope() {
        let result = parse_body(
            r#"{"mission": 1, "result": {"mission": 4}, "anti_challenge": 0, "strategic_fit": 0}"#,
        )
        .unwrap();
        assert_eq!(result.scores.mission_alignment, 1.0);
    }

    #[test]
    fn test_null_alias_is_skipped() {
        let result = parse_body(r#"{"mission_alignment": null, "mission": 2.5}"#).unwrap();
        assert_eq!(result.scores.mission_alignment, 2.5);
        assert_eq!(result.scores.anti_challenge, 0.0);
    }

    #[test]
    fn test_out_of_range_category_rejected() {
        let err = parse_body(r#"{"mission_alignment": 4.5, "anti_challenge": 1, "strategic_fit": 1}"#)
            .unwrap_err();
        match err {
            ProviderError::Validation { field, max, .. } => {
                assert_eq!(field, "mission_alignment");
                assert_eq!(max, 4.0);
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_final_score_override() {
        let result = parse_body(
            r#"{"mission_alignment": 1, "anti_challenge": 1, "strategic_fit": 1, "final_score": 9.1}"#,
        )
        .unwrap();
        assert_eq!(result.final_score, 9.1);
        assert_eq!(result.recommendation, Recommendation::StronglyPursue);

        let zero = parse_body(
            r#"{"mission_alignment": 1, "anti_challenge": 1, "strategic_fit": 1, "score": 0}"#,
        )
        .unwrap();
        assert_eq!(zero.final_score, 3.0);

        let bad = parse_body(r#"{"mission_alignment": 1, "total": 42}"#).unwrap_err();
        assert!(matches!(bad, ProviderError::Validation { .. }));
    }

    #[test]
    fn test_explicit_recommendation_and_unknown_label() {
        let explicit = parse_body(
            r#"{"mission_alignment": 4, "anti_challenge": 3.5, "strategic_fit": 2.5, "recommendation": "review"}"#,
        )
        .unwrap();
        assert_eq!(explicit.recommendation, Recommendation::Review);

        let unknown = parse_body(
            r#"{"mission_alignment": 1, "anti_challenge": 1, "strategic_fit": 1, "decision": "ship it"}"#,
        )
        .unwrap();
        assert_eq!(unknown.recommendation, Recommendation::Deprioritize);
    }

    #[test]
    fn test_explanation_shapes() {
        let object = parse_body(
            r#"{"mission": 1, "explanations": {"mission_alignment": "weak", "overall": "meh"}}"#,
        )
        .unwrap();
        assert_eq!(object.explanation("mission_alignment"), Some("weak"));
        assert_eq!(object.explanation("overall"), Some("meh"));

        let array = parse_body(r#"{"mission": 1, "analysis": ["one.", "two."]}"#).unwrap();
        assert_eq!(array.explanation("overall"), Some("one. two."));
    }

    #[test]
    fn test_no_recognized_fields_is_parse_error() {
        let err = parse_body(r#"{"status": "ok"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn test_non_numeric_score_is_parse_error() {
        let err = parse_body(r#"{"mission_alignment": "high"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn test_text_fallback() {
        let result = parse_body("  Looks promising, worth a closer look.\n").unwrap();
        assert_eq!(result.scores, ScoreBreakdown::midpoint());
        assert_eq!(result.final_score, 5.0);
        assert_eq!(result.recommendation, Recommendation::Review);
        assert_eq!(
            result.explanation("overall"),
            Some("Looks promising, worth a closer look.")
        );

        // A JSON array is not a document.
        let array = parse_body("[1, 2, 3]").unwrap();
        assert_eq!(array.recommendation, Recommendation::Review);
    }

    proptest! {
        #[test]
        fn prop_final_is_sum_when_absent(
            m in 0.0f64..=4.0,
            a in 0.0f64..=3.5,
            s in 0.0f64..=2.5,
        ) {
            let body = serde_json::json!({
                "mission_alignment": m,
                "anti_challenge": a,
                "strategic_fit": s,
            })
            .to_string();
            let result = parse_body(&body).unwrap();
            prop_assert!((result.final_score - (m + a + s)).abs() < 1e-9);
            prop_assert_eq!(result.recommendation, Recommendation::from_score(result.final_score));
        }

        #[test]
        fn prop_text_fallback_is_total(body in "[^{]{0,80}") {
            let result = parse_body(&body).unwrap();
            prop_assert_eq!(result.recommendation, Recommendation::Review);
        }
    }
}
