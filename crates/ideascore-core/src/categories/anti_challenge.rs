//! Anti-Challenge
//!
//! **Question**: Does this avoid what we said we won't do?
//!
//! Starts at the full bound and loses points for every anti-pattern the
//! idea substantially matches.

use std::collections::BTreeSet;

use crate::types::{Category, DomainContext};

use super::{bounded, overlap, CategoryFinding, CategoryScorer};

/// Minimum overlap for an anti-pattern to count as matched.
const MATCH_THRESHOLD: f64 = 0.5;

/// Points removed per fully matched anti-pattern.
const PENALTY: f64 = 1.5;

pub struct AntiChallengeScorer;

impl AntiChallengeScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AntiChallengeScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryScorer for AntiChallengeScorer {
    fn category(&self) -> Category {
        Category::AntiChallenge
    }

    fn score(&self, idea: &BTreeSet<String>, context: &DomainContext) -> CategoryFinding {
        let category = self.category();

        let matched: Vec<(&str, f64)> = context
            .anti_patterns
            .iter()
            .map(|p| (p.as_str(), overlap(idea, p)))
            .filter(|(_, o)| *o >= MATCH_THRESHOLD)
            .collect();

        let penalty: f64 = matched.iter().map(|(_, o)| o * PENALTY).sum();
        let score = bounded(category, category.max_score() - penalty);

        let explanation = if matched.is_empty() {
            "No anti-patterns matched.".to_string()
        } else {
            let names: Vec<&str> = matched.iter().map(|(p, _)| *p).collect();
            format!("Matches anti-pattern(s): {}.", names.join("; "))
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
    fn test_clean_idea_keeps_full_score() {
        let context = DomainContext::new().with_anti_pattern("vanity metrics");
        let finding = AntiChallengeScorer::new().score(&terms("automate invoicing"), &context);
        assert_eq!(finding.score, 3.5);
    }

    #[test]
    fn test_matched_anti_pattern_costs_points() {
        let context = DomainContext::new().with_anti_pattern("vanity metrics dashboard");
        let finding =
            AntiChallengeScorer::new().score(&terms("build a vanity metrics dashboard"), &context);
        assert_eq!(finding.score, 2.0);
        assert!(finding.explanation.contains("vanity metrics dashboard"));
    }

    #[test]
    fn test_penalties_never_go_negative() {
        let context = DomainContext::new()
            .with_anti_pattern("rewrite everything")
            .with_anti_pattern("rewrite from scratch")
            .with_anti_pattern("everything from scratch");
        let finding = AntiChallengeScorer::new()
            .score(&terms("rewrite everything from scratch"), &context);
        assert_eq!(finding.score, 0.0);
    }
}
