//! Synthesizer: combines category findings into a final result.
//!
//! The policy is fixed:
//! 1. Final score is the sum of the three category scores
//! 2. Recommendation follows the thresholds 8.0 / 6.0 / 4.0
//! 3. Each category contributes its explanation under its own key

use std::collections::BTreeMap;

use crate::categories::CategoryFinding;
use crate::types::{AnalysisResult, Category, ScoreBreakdown};
use crate::ScoringError;

/// The Synthesizer aggregates category findings into an `AnalysisResult`.
pub struct Synthesizer;

impl Synthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Synthesize findings into a result.
    ///
    /// Findings for a category that is missing from `findings` score zero.
    /// Any score outside its bound is rejected.
    pub fn synthesize(&self, findings: &[CategoryFinding]) -> Result<AnalysisResult, ScoringError> {
        let score_of = |category: Category| {
            findings
                .iter()
                .find(|f| f.category == category)
                .map(|f| f.score)
                .unwrap_or(0.0)
        };

        let scores = ScoreBreakdown::new(
            score_of(Category::MissionAlignment),
            score_of(Category::AntiChallenge),
            score_of(Category::StrategicFit),
        )?;

        let mut explanations: BTreeMap<String, String> = findings
            .iter()
            .map(|f| (f.category.key().to_string(), f.explanation.clone()))
            .collect();

        let result = AnalysisResult::from_scores(scores, BTreeMap::new());
        explanations.insert(
            "overall".to_string(),
            format!(
                "Scored {:.2}/10 ({}).",
                result.final_score, result.recommendation
            ),
        );

        Ok(AnalysisResult {
            explanations,
            ..result
        })
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}
