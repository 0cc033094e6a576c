//! Analysis providers for ideascore-runtime.
//!
//! This module defines the provider capability and the closed set of
//! provider kinds: the deterministic rule engine, the local generation
//! service client, the configurable generic HTTP adapter, and the two
//! decorators (fallback chain and similarity cache).
//!
//! ## Contract
//!
//! Providers never retry internally. Retry and fallback belong to
//! [`FallbackProvider`](crate::resilience::FallbackProvider) and the
//! [`Manager`](crate::manager::Manager). Every provider is safe to call
//! concurrently and keeps no call-to-call mutable state.
//!
//! ## Security
//!
//! Header values for HTTP providers are held by [`secrets::HeaderSet`] and
//! never appear in `Debug` output.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use ideascore_core::{AnalysisRequest, AnalysisResult, ScoringError};

mod cached;
mod factory;
mod generic_http;
mod network_generate;
pub mod response;
mod rule_based;
pub mod secrets;
pub mod template;

pub use cached::CachedProvider;
pub use factory::{build_provider, ProviderConfig};
pub use generic_http::{GenericHttpConfig, GenericHttpProvider};
pub use network_generate::{NetworkGenerateConfig, NetworkGenerateProvider};
pub use rule_based::{RuleBasedProvider, RULE_BASED_PROVIDER_NAME};
pub use secrets::{CredentialSource, HeaderSet};
pub use template::{RequestTemplate, TemplateError};

use crate::resilience::FallbackProvider;

/// Maximum number of response-body bytes carried in a status error.
pub const MAX_ERROR_BODY_BYTES: usize = 512;

/// Errors from analysis providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Domain context is required by this provider")]
    MissingContext,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Validation failed: {field} = {value} is outside [0, {max}]")]
    Validation { field: String, value: f64, max: f64 },

    #[error("All {attempts} attempted providers failed; last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<ProviderError>,
    },

    #[error("No providers available")]
    NoProvidersAvailable,

    #[error("Fallback deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Coarse classification of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing endpoint, bad template, missing context. Never worth retrying.
    Configuration,
    /// Timeout or connection failure.
    Transport,
    /// Non-2xx response.
    Status,
    /// Unparseable or out-of-bound response.
    Validation,
    /// A composite provider ran out of members or time.
    Exhausted,
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::NotConfigured(_)
            | ProviderError::Template(_)
            | ProviderError::MissingContext
            | ProviderError::InvalidRequest(_) => ErrorKind::Configuration,
            ProviderError::Http(_) | ProviderError::Timeout(_) => ErrorKind::Transport,
            ProviderError::Status { .. } => ErrorKind::Status,
            ProviderError::Parse(_) | ProviderError::Validation { .. } => ErrorKind::Validation,
            ProviderError::Exhausted { .. }
            | ProviderError::NoProvidersAvailable
            | ProviderError::DeadlineExceeded(_) => ErrorKind::Exhausted,
        }
    }

    /// Whether another attempt against the same backend could succeed.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Map a reqwest error, distinguishing timeouts.
    pub(crate) fn from_transport(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::Http(error.to_string())
        }
    }
}

impl From<ScoringError> for ProviderError {
    fn from(error: ScoringError) -> Self {
        match error {
            ScoringError::MissingContext => ProviderError::MissingContext,
            ScoringError::EmptyIdea => {
                ProviderError::InvalidRequest("idea text is empty".to_string())
            }
            ScoringError::OutOfRange {
                category,
                value,
                max,
            } => ProviderError::Validation {
                field: category.key().to_string(),
                value,
                max,
            },
        }
    }
}

/// Truncate a response body for inclusion in an error, on a char boundary.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_BYTES {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// The provider capability.
///
/// # Isolation Contract
/// - MUST NOT retry internally
/// - MUST be safe for concurrent invocation
/// - MUST NOT keep mutable state between calls (caches excepted, which
///   synchronize internally)
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Stable identifier used for stats, priority lists and logs.
    fn name(&self) -> &str;

    /// Cheap liveness probe. Network-backed providers bound it by a short
    /// timeout.
    async fn is_available(&self) -> bool;

    /// Score one idea.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ProviderError>;
}

/// The closed set of provider kinds.
///
/// Decorators hold their inner providers, so a `Provider` can be an
/// arbitrarily nested composition (for example a cached fallback chain).
#[derive(Debug)]
pub enum Provider {
    RuleBased(RuleBasedProvider),
    NetworkGenerate(NetworkGenerateProvider),
    GenericHttp(GenericHttpProvider),
    Fallback(FallbackProvider),
    Cached(CachedProvider),
}

impl Provider {
    /// Short tag naming the provider kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Provider::RuleBased(_) => "rule_based",
            Provider::NetworkGenerate(_) => "network_generate",
            Provider::GenericHttp(_) => "generic_http",
            Provider::Fallback(_) => "fallback_chain",
            Provider::Cached(_) => "cached",
        }
    }

    /// The similarity cache, when this provider is a cache decorator.
    pub fn as_cached(&self) -> Option<&CachedProvider> {
        match self {
            Provider::Cached(cached) => Some(cached),
            _ => None,
        }
    }
}

#[async_trait]
impl AnalysisProvider for Provider {
    fn name(&self) -> &str {
        match self {
            Provider::RuleBased(p) => p.name(),
            Provider::NetworkGenerate(p) => p.name(),
            Provider::GenericHttp(p) => p.name(),
            Provider::Fallback(p) => p.name(),
            Provider::Cached(p) => p.name(),
        }
    }

    async fn is_available(&self) -> bool {
        match self {
            Provider::RuleBased(p) => p.is_available().await,
            Provider::NetworkGenerate(p) => p.is_available().await,
            Provider::GenericHttp(p) => p.is_available().await,
            Provider::Fallback(p) => p.is_available().await,
            Provider::Cached(p) => p.is_available().await,
        }
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ProviderError> {
        match self {
            Provider::RuleBased(p) => p.analyze(request).await,
            Provider::NetworkGenerate(p) => p.analyze(request).await,
            Provider::GenericHttp(p) => p.analyze(request).await,
            Provider::Fallback(p) => p.analyze(request).await,
            Provider::Cached(p) => p.analyze(request).await,
        }
    }
}

impl From<RuleBasedProvider> for Provider {
    fn from(p: RuleBasedProvider) -> Self {
        Provider::RuleBased(p)
    }
}

impl From<NetworkGenerateProvider> for Provider {
    fn from(p: NetworkGenerateProvider) -> Self {
        Provider::NetworkGenerate(p)
    }
}

impl From<GenericHttpProvider> for Provider {
    fn from(p: GenericHttpProvider) -> Self {
        Provider::GenericHttp(p)
    }
}

impl From<FallbackProvider> for Provider {
    fn from(p: FallbackProvider) -> Self {
        Provider::Fallback(p)
    }
}

impl From<CachedProvider> for Provider {
    fn from(p: CachedProvider) -> Self {
        Provider::Cached(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideascore_core::Category;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ProviderError::NotConfigured("x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Transport
        );
        assert!(ProviderError::Http("refused".into()).is_transient());
        assert!(!ProviderError::Status {
            status: 500,
            body: String::new()
        }
        .is_transient());
        assert_eq!(ProviderError::NoProvidersAvailable.kind(), ErrorKind::Exhausted);
    }

    #[test]
    fn test_scoring_error_maps_to_validation() {
        let err: ProviderError = ScoringError::OutOfRange {
            category: Category::AntiChallenge,
            value: 4.0,
            max: 3.5,
        }
        .into();

        match err {
            ProviderError::Validation { field, value, max } => {
                assert_eq!(field, "anti_challenge");
                assert_eq!(value, 4.0);
                assert_eq!(max, 3.5);
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let short = "oops";
        assert_eq!(truncate_body(short), "oops");

        let long = "é".repeat(MAX_ERROR_BODY_BYTES);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= MAX_ERROR_BODY_BYTES + 3);
    }

    #[tokio::test]
    async fn test_provider_dispatch() {
        let provider: Provider = RuleBasedProvider::new().into();
        assert_eq!(provider.kind(), "rule_based");
        assert_eq!(provider.name(), "rule_based");
        assert!(provider.is_available().await);
        assert!(provider.as_cached().is_none());
    }
}
