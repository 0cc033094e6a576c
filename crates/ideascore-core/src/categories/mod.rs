//! Category scorers.
//!
//! Each category answers one question about an idea:
//!
//! | Category | Question | Bound |
//! |----------|----------|-------|
//! | Mission alignment | Does this advance what we said we want? | 4.0 |
//! | Anti-challenge | Does this avoid what we said we won't do? | 3.5 |
//! | Strategic fit | Does this follow how we said we'd get there? | 2.5 |
//!
//! Scoring is term overlap between the idea and the domain-context phrases.
//! It is deterministic: the same idea and context always score the same.

mod anti_challenge;
mod mission;
mod strategic;

pub use anti_challenge::AntiChallengeScorer;
pub use mission::MissionAlignmentScorer;
pub use strategic::StrategicFitScorer;

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

use crate::types::{Category, DomainContext};

lazy_static! {
    static ref WORD_PATTERN: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

/// Words too common to carry signal when matching phrases.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "our", "your", "their", "are",
    "was", "were", "will", "would", "should", "can", "could", "about", "over", "more", "less",
    "all", "any", "not", "but", "its", "who", "what", "when", "how", "why",
];

/// Finding produced by a single category scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFinding {
    pub category: Category,
    pub score: f64,
    pub explanation: String,
}

/// A scorer for one category.
pub trait CategoryScorer: Send + Sync {
    fn category(&self) -> Category;

    /// Score the idea terms against the context. Implementations must stay
    /// within `self.category().max_score()`.
    fn score(&self, idea: &BTreeSet<String>, context: &DomainContext) -> CategoryFinding;
}

/// Extract significant terms: lowercase words of three or more characters,
/// excluding stopwords.
pub fn terms(text: &str) -> BTreeSet<String> {
    WORD_PATTERN
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Fraction of the phrase's terms that appear in the idea. Zero when the
/// phrase has no significant terms.
pub fn overlap(idea: &BTreeSet<String>, phrase: &str) -> f64 {
    let phrase_terms = terms(phrase);
    if phrase_terms.is_empty() {
        return 0.0;
    }
    let matched = phrase_terms.iter().filter(|t| idea.contains(*t)).count();
    matched as f64 / phrase_terms.len() as f64
}

/// Round to two decimals and clamp into the category bound.
pub(crate) fn bounded(category: Category, raw: f64) -> f64 {
    let clamped = raw.clamp(0.0, category.max_score());
    (clamped * 100.0).round() / 100.0
}
