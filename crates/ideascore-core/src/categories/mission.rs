//! Mission Alignment
//!
//! **Question**: Does this advance what we said we want?
//!
//! The best-matching goal carries most of the weight; breadth across all
//! goals adds the rest.

use std::collections::BTreeSet;

use crate::types::{Category, DomainContext};

use super::{bounded, overlap, CategoryFinding, CategoryScorer};

const BEST_WEIGHT: f64 = 0.7;
const BREADTH_WEIGHT: f64 = 0.3;

pub struct MissionAlignmentScorer;

impl MissionAlignmentScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MissionAlignmentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryScorer for MissionAlignmentScorer {
    fn category(&self) -> Category {
        Category::MissionAlignment
    }

    fn score(&self, idea: &BTreeSet<String>, context: &DomainContext) -> CategoryFinding {
        let category = self.category();

        if context.goals.is_empty() {
            return CategoryFinding {
                category,
                score: category.midpoint(),
                explanation: "No goals defined; mission alignment is neutral.".to_string(),
            };
        }

        let overlaps: Vec<(f64, &str)> = context
            .goals
            .iter()
            .map(|goal| (overlap(idea, goal), goal.as_str()))
            .collect();

        let (best, best_goal) = overlaps
            .iter()
            .copied()
            .fold((0.0_f64, ""), |acc, cur| if cur.0 > acc.0 { cur } else { acc });
        let breadth = overlaps.iter().map(|(o, _)| o).sum::<f64>() / overlaps.len() as f64;

        let score = bounded(
            category,
            category.max_score() * (BEST_WEIGHT * best + BREADTH_WEIGHT * breadth),
        );

        let explanation = if best > 0.0 {
            format!(
                "Closest goal: \"{}\" ({:.0}% term overlap across {} goal(s)).",
                best_goal,
                best * 100.0,
                overlaps.len()
            )
        } else {
            format!("No overlap with any of {} goal(s).", overlaps.len())
        };

        CategoryFinding {
            category,
            score,
            explanation,
        }
    }
}
