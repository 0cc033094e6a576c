//! Strategic Fit
//!
//! **Question**: Does this follow how we said we'd get there?

use std::collections::BTreeSet;

use crate::types::{Category, DomainContext};

use super::{bounded, overlap, CategoryFinding, CategoryScorer};

/// A strategy counts as supported once a third of its terms appear.
const SUPPORT_THRESHOLD: f64 = 0.34;

pub struct StrategicFitScorer;

impl StrategicFitScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StrategicFitScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryScorer for StrategicFitScorer {
    fn category(&self) -> Category {
        Category::StrategicFit
    }

    fn score(&self, idea: &BTreeSet<String>, context: &DomainContext) -> CategoryFinding {
        let category = self.category();

        if context.strategies.is_empty() {
            return CategoryFinding {
                category,
                score: category.midpoint(),
                explanation: "No strategies defined; strategic fit is neutral.".to_string(),
            };
        }

        let supported: Vec<&str> = context
            .strategies
            .iter()
            .filter(|s| overlap(idea, s) >= SUPPORT_THRESHOLD)
            .map(String::as_str)
            .collect();

        let ratio = supported.len() as f64 / context.strategies.len() as f64;
        let score = bounded(category, category.max_score() * ratio);

        let explanation = if supported.is_empty() {
            format!("Supports none of {} strategies.", context.strategies.len())
        } else {
            format!(
                "Supports {} of {} strategies: {}.",
                supported.len(),
                context.strategies.len(),
                supported.join("; ")
            )
        };

        CategoryFinding {
            category,
            score,
            explanation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::terms;

    #[test]
    fn test_partial_support() {
        let context = DomainContext::new()
            .with_strategy("open source tooling")
            .with_strategy("enterprise sales");
        let finding = StrategicFitScorer::new().score(&terms("open source release tool"), &context);
        assert_eq!(finding.score, 1.25);
        assert!(finding.explanation.contains("1 of 2"));
    }

    #[test]
    fn test_no_strategies_is_neutral() {
        let finding = StrategicFitScorer::new().score(&terms("anything"), &DomainContext::new());
        assert_eq!(finding.score, 1.25);
    }
}
