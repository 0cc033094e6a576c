//! Shared analysis types.
//!
//! These types cross every provider boundary: the rule engine, the HTTP
//! adapters, the similarity cache and the manager all speak
//! `AnalysisRequest` in and `AnalysisResult` out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::ScoringError;

/// One of the three weighted sub-scores that compose the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// How directly the idea advances the stated goals. Bounded to [0, 4.0].
    MissionAlignment,
    /// How well the idea avoids the known anti-patterns. Bounded to [0, 3.5].
    AntiChallenge,
    /// How well the idea fits the declared strategies. Bounded to [0, 2.5].
    StrategicFit,
}

impl Category {
    /// All categories in weight order.
    pub const ALL: [Category; 3] = [
        Category::MissionAlignment,
        Category::AntiChallenge,
        Category::StrategicFit,
    ];

    /// Upper bound of this category's score.
    pub fn max_score(self) -> f64 {
        match self {
            Category::MissionAlignment => 4.0,
            Category::AntiChallenge => 3.5,
            Category::StrategicFit => 2.5,
        }
    }

    /// Half of the category bound, used when a backend gives no usable signal.
    pub fn midpoint(self) -> f64 {
        self.max_score() / 2.0
    }

    /// Stable snake_case key, used in explanation maps and JSON payloads.
    pub fn key(self) -> &'static str {
        match self {
            Category::MissionAlignment => "mission_alignment",
            Category::AntiChallenge => "anti_challenge",
            Category::StrategicFit => "strategic_fit",
        }
    }

    /// Check that `value` lies inside this category's bound.
    pub fn check(self, value: f64) -> Result<f64, ScoringError> {
        if value.is_finite() && (0.0..=self.max_score()).contains(&value) {
            Ok(value)
        } else {
            Err(ScoringError::OutOfRange {
                category: self,
                value,
                max: self.max_score(),
            })
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Discrete label derived from the final score.
///
/// Variants are declared in ascending order so that `Ord` follows the score:
/// `Deprioritize < Review < Pursue < StronglyPursue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Deprioritize,
    Review,
    Pursue,
    StronglyPursue,
}

impl Recommendation {
    pub const STRONGLY_PURSUE_THRESHOLD: f64 = 8.0;
    pub const PURSUE_THRESHOLD: f64 = 6.0;
    pub const REVIEW_THRESHOLD: f64 = 4.0;

    /// Derive the recommendation from a final score.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::STRONGLY_PURSUE_THRESHOLD {
            Recommendation::StronglyPursue
        } else if score >= Self::PURSUE_THRESHOLD {
            Recommendation::Pursue
        } else if score >= Self::REVIEW_THRESHOLD {
            Recommendation::Review
        } else {
            Recommendation::Deprioritize
        }
    }

    /// Parse a label produced by an external service.
    ///
    /// Accepts any casing and `-`/space separators ("Strongly Pursue",
    /// "strongly-pursue"). Returns `None` for unknown labels.
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "strongly_pursue" => Some(Recommendation::StronglyPursue),
            "pursue" => Some(Recommendation::Pursue),
            "review" => Some(Recommendation::Review),
            "deprioritize" | "deprioritise" => Some(Recommendation::Deprioritize),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::StronglyPursue => "strongly_pursue",
            Recommendation::Pursue => "pursue",
            Recommendation::Review => "review",
            Recommendation::Deprioritize => "deprioritize",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Goals, strategies and anti-patterns an idea is scored against.
///
/// Supplied by the caller and passed through verbatim; the runtime only
/// checks for its presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainContext {
    #[serde(default)]
    pub goals: Vec<String>,

    #[serde(default)]
    pub strategies: Vec<String>,

    #[serde(default)]
    pub anti_patterns: Vec<String>,
}

impl DomainContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goals.push(goal.into());
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategies.push(strategy.into());
        self
    }

    pub fn with_anti_pattern(mut self, anti_pattern: impl Into<String>) -> Self {
        self.anti_patterns.push(anti_pattern.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty() && self.strategies.is_empty() && self.anti_patterns.is_empty()
    }
}

/// Human-readable rendering, one section per list.
impl fmt::Display for DomainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("Goals", &self.goals),
            ("Strategies", &self.strategies),
            ("Anti-patterns", &self.anti_patterns),
        ];

        let mut first = true;
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "{}:", title)?;
            for item in items {
                writeln!(f, "- {}", item)?;
            }
        }
        Ok(())
    }
}

/// A request to score a single idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub idea: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<DomainContext>,
}

impl AnalysisRequest {
    pub fn new(idea: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: DomainContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Inverse of the rounding step applied to summed scores (six decimals).
pub const SCORE_PRECISION: f64 = 1e6;

/// The three category sub-scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub mission_alignment: f64,
    pub anti_challenge: f64,
    pub strategic_fit: f64,
}

impl ScoreBreakdown {
    /// Build a breakdown, rejecting any score outside its category bound.
    pub fn new(
        mission_alignment: f64,
        anti_challenge: f64,
        strategic_fit: f64,
    ) -> Result<Self, ScoringError> {
        Ok(Self {
            mission_alignment: Category::MissionAlignment.check(mission_alignment)?,
            anti_challenge: Category::AntiChallenge.check(anti_challenge)?,
            strategic_fit: Category::StrategicFit.check(strategic_fit)?,
        })
    }

    /// Every category at its midpoint.
    pub fn midpoint() -> Self {
        Self {
            mission_alignment: Category::MissionAlignment.midpoint(),
            anti_challenge: Category::AntiChallenge.midpoint(),
            strategic_fit: Category::StrategicFit.midpoint(),
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::MissionAlignment => self.mission_alignment,
            Category::AntiChallenge => self.anti_challenge,
            Category::StrategicFit => self.strategic_fit,
        }
    }

    /// Category sum, rounded to [`SCORE_PRECISION`] so that decimal inputs
    /// adding up to a threshold land on it exactly.
    pub fn total(&self) -> f64 {
        let sum = self.mission_alignment + self.anti_challenge + self.strategic_fit;
        (sum * SCORE_PRECISION).round() / SCORE_PRECISION
    }

    /// Re-check every category against its bound.
    pub fn validate(&self) -> Result<(), ScoringError> {
        for category in Category::ALL {
            category.check(self.get(category))?;
        }
        Ok(())
    }
}

/// Outcome of one analysis, whichever provider produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub scores: ScoreBreakdown,

    /// Sum of `scores` unless the producing provider overrode it.
    pub final_score: f64,

    pub recommendation: Recommendation,

    /// Category key (or "overall") to explanation text.
    #[serde(default)]
    pub explanations: BTreeMap<String, String>,

    /// Name of the provider that produced this result.
    #[serde(default)]
    pub provider: String,

    #[serde(default, with = "duration_millis")]
    pub duration: Duration,

    #[serde(default)]
    pub from_cache: bool,
}

impl AnalysisResult {
    /// Build a result whose final score is the category sum and whose
    /// recommendation follows the fixed thresholds.
    pub fn from_scores(scores: ScoreBreakdown, explanations: BTreeMap<String, String>) -> Self {
        let final_score = scores.total();
        Self {
            scores,
            final_score,
            recommendation: Recommendation::from_score(final_score),
            explanations,
            provider: String::new(),
            duration: Duration::ZERO,
            from_cache: false,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn explanation(&self, key: &str) -> Option<&str> {
        self.explanations.get(key).map(String::as_str)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
