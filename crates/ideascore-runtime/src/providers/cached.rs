//! Cache decorator: puts a [`SimilarityCache`] in front of any provider.
//!
//! Only successful results are stored. The cache is keyed on the idea text
//! alone; each decorated provider owns its own cache.

use async_trait::async_trait;
use std::sync::Arc;

use ideascore_core::{AnalysisRequest, AnalysisResult};

use super::{AnalysisProvider, Provider, ProviderError};
use crate::cache::{CacheConfig, SimilarityCache};

#[derive(Debug)]
pub struct CachedProvider {
    inner: Box<Provider>,
    cache: Arc<SimilarityCache>,
}

impl CachedProvider {
    pub fn new(inner: impl Into<Provider>, config: CacheConfig) -> Self {
        Self::with_cache(inner, Arc::new(SimilarityCache::new(config)))
    }

    pub fn with_cache(inner: impl Into<Provider>, cache: Arc<SimilarityCache>) -> Self {
        Self {
            inner: Box::new(inner.into()),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<SimilarityCache> {
        &self.cache
    }

    pub fn inner(&self) -> &Provider {
        &self.inner
    }
}

#[async_trait]
impl AnalysisProvider for CachedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ProviderError> {
        if let Some(hit) = self.cache.get(&request.idea) {
            return Ok(hit);
        }

        let result = self.inner.analyze(request).await?;
        self.cache.store(&request.idea, result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::RuleBasedProvider;
    use ideascore_core::DomainContext;

    fn request(idea: &str) -> AnalysisRequest {
        AnalysisRequest::new(idea).with_context(
            DomainContext::new()
                .with_goal("build automation tooling")
                .with_strategy("developer experience"),
        )
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let provider = CachedProvider::new(RuleBasedProvider::new(), CacheConfig::default());

        let first = provider.analyze(&request("build automation tool")).await.unwrap();
        assert!(!first.from_cache);

        let second = provider.analyze(&request("automation tool build")).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.final_score, first.final_score);
        assert_eq!(second.provider, "rule_based");

        let stats = provider.cache().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let provider = CachedProvider::new(RuleBasedProvider::new(), CacheConfig::default());

        let err = provider
            .analyze(&AnalysisRequest::new("no context here"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingContext));
        assert!(provider.cache().is_empty());
    }

    #[tokio::test]
    async fn test_delegates_name_and_availability() {
        let provider = CachedProvider::new(
            RuleBasedProvider::with_name("heuristics"),
            CacheConfig::default(),
        );
        assert_eq!(provider.name(), "heuristics");
        assert!(provider.is_available().await);
        assert_eq!(provider.inner().kind(), "rule_based");
    }
}
