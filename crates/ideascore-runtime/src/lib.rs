//! # ideascore-runtime
//!
//! Interchangeable scoring backends for ideascore, composed and supervised.
//!
//! This crate provides:
//! - Providers: the deterministic rule engine, a local generation service
//!   client, and a configurable generic HTTP adapter
//! - A similarity cache with TTL and LRU eviction, as a provider decorator
//! - An ordered fallback chain, as a provider
//! - A [`Manager`] that tracks per-provider statistics and health and routes
//!   each request to a primary provider with automatic fallback
//!
//! ## Example
//!
//! ```rust,ignore
//! use ideascore_core::{AnalysisRequest, DomainContext};
//! use ideascore_runtime::{Manager, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_yaml_file("ideascore.yaml")?;
//! let manager = Manager::from_config(&config)?;
//!
//! let request = AnalysisRequest::new("Self-serve deploy previews")
//!     .with_context(DomainContext::new().with_goal("Ship faster"));
//! let result = manager.analyze(&request).await?;
//! println!("{} ({})", result.final_score, result.recommendation);
//! ```

pub mod cache;
pub mod config;
pub mod manager;
pub mod prompts;
pub mod providers;
pub mod resilience;

pub use cache::{CacheConfig, CacheStats, SimilarityCache};
pub use config::{CacheSettings, ConfigError, ManagerSettings, RuntimeConfig};
pub use manager::{
    HealthCheckHandle, HealthStatus, Manager, ManagerError, ProviderStats, ProviderStatsSnapshot,
};
pub use providers::{
    AnalysisProvider, CachedProvider, ErrorKind, GenericHttpConfig, GenericHttpProvider,
    NetworkGenerateConfig, NetworkGenerateProvider, Provider, ProviderConfig, ProviderError,
    RuleBasedProvider,
};
pub use resilience::FallbackProvider;
