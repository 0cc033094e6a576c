//! Deterministic rule-based provider.
//!
//! Always available. Delegates to `ideascore_core::evaluate_request`, so it
//! needs no network and never times out.

use async_trait::async_trait;
use std::time::Instant;

use ideascore_core::{AnalysisRequest, AnalysisResult};

use super::{AnalysisProvider, ProviderError};

pub const RULE_BASED_PROVIDER_NAME: &str = "rule_based";

#[derive(Debug, Clone)]
pub struct RuleBasedProvider {
    name: String,
}

impl RuleBasedProvider {
    pub fn new() -> Self {
        Self::with_name(RULE_BASED_PROVIDER_NAME)
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for RuleBasedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisProvider for RuleBasedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ProviderError> {
        let started = Instant::now();
        let result = ideascore_core::evaluate_request(request)?;

        Ok(result
            .with_provider(self.name.as_str())
            .with_duration(started.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideascore_core::DomainContext;

    #[tokio::test]
    async fn test_rule_based_scores_with_context() {
        let provider = RuleBasedProvider::new();
        let request = AnalysisRequest::new("automate deployments").with_context(
            DomainContext::new().with_goal("automate deployments"),
        );

        let result = provider.analyze(&request).await.unwrap();
        assert_eq!(result.provider, "rule_based");
        assert_eq!(result.scores.mission_alignment, 4.0);
        assert!(!result.from_cache);
    }

    #[tokio::test]
    async fn test_rule_based_requires_context() {
        let provider = RuleBasedProvider::new();
        let result = provider.analyze(&AnalysisRequest::new("anything")).await;
        assert!(matches!(result, Err(ProviderError::MissingContext)));
    }

    #[tokio::test]
    async fn test_rule_based_custom_name() {
        let provider = RuleBasedProvider::with_name("heuristics");
        assert_eq!(provider.name(), "heuristics");
        assert!(provider.is_available().await);
    }
}
