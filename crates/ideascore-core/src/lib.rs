//! # ideascore-core
//!
//! Deterministic idea scoring engine.
//!
//! This crate scores a short idea against a domain context of goals,
//! strategies and anti-patterns, producing three bounded category scores,
//! their sum, and a recommendation label.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same idea and context always produce the same result
//! 2. **Bounded**: Every category score stays inside its declared bound
//! 3. **No I/O**: Scoring never touches the network or the filesystem
//!
//! ## Example
//!
//! ```rust
//! use ideascore_core::{evaluate, DomainContext, Recommendation};
//!
//! let context = DomainContext::new()
//!     .with_goal("automate release engineering")
//!     .with_strategy("developer tooling")
//!     .with_anti_pattern("manual approvals");
//!
//! let result = evaluate("Automate release engineering with better tooling", &context).unwrap();
//! assert!(result.recommendation >= Recommendation::Review);
//! ```

pub mod categories;
pub mod synthesizer;
pub mod types;

pub use categories::{
    AntiChallengeScorer, CategoryFinding, CategoryScorer, MissionAlignmentScorer,
    StrategicFitScorer,
};
pub use synthesizer::Synthesizer;
pub use types::{
    AnalysisRequest, AnalysisResult, Category, DomainContext, Recommendation, ScoreBreakdown,
    SCORE_PRECISION,
};

use thiserror::Error;

/// Errors that can occur during scoring.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("domain context is required for rule-based scoring")]
    MissingContext,

    #[error("idea text is empty")]
    EmptyIdea,

    #[error("{category} score {value} is outside [0, {max}]")]
    OutOfRange {
        category: Category,
        value: f64,
        max: f64,
    },
}

/// Score an idea against a domain context.
///
/// This is the main entry point for deterministic scoring.
pub fn evaluate(idea: &str, context: &DomainContext) -> Result<AnalysisResult, ScoringError> {
    if idea.trim().is_empty() {
        return Err(ScoringError::EmptyIdea);
    }

    let idea_terms = categories::terms(idea);

    let scorers: [&dyn CategoryScorer; 3] = [
        &MissionAlignmentScorer,
        &AntiChallengeScorer,
        &StrategicFitScorer,
    ];
    let findings: Vec<CategoryFinding> = scorers
        .iter()
        .map(|s| s.score(&idea_terms, context))
        .collect();

    tracing::trace!(
        terms = idea_terms.len(),
        findings = findings.len(),
        "Scored idea deterministically"
    );

    Synthesizer::new().synthesize(&findings)
}

/// Score a request, requiring its domain context.
pub fn evaluate_request(request: &AnalysisRequest) -> Result<AnalysisResult, ScoringError> {
    let context = request.context.as_ref().ok_or(ScoringError::MissingContext)?;
    evaluate(&request.idea, context)
}
