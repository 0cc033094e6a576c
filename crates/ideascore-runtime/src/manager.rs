//! Provider manager.
//!
//! Owns the ordered provider list, routes requests to a primary provider
//! with automatic fallback, and keeps per-provider statistics and an
//! advisory health map.
//!
//! ## Locking
//!
//! One reader/writer lock guards the provider list, the primary name, the
//! fallback flag and the health map. It is never held across an `.await`:
//! `analyze` copies what it needs and releases the lock before calling any
//! provider. Statistics are lock-free atomics.
//!
//! ## Health
//!
//! The health map is informational. Routing always re-checks
//! `is_available()` live.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use ideascore_core::{AnalysisRequest, AnalysisResult};

use crate::cache::CacheStats;
use crate::config::{ConfigError, RuntimeConfig};
use crate::providers::{build_provider, AnalysisProvider, CachedProvider, Provider, ProviderError};

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("No providers registered")]
    NoProviders,

    #[error("No registered provider is available")]
    NoAvailableProvider,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Provider already registered: {0}")]
    DuplicateProvider(String),

    #[error("Provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("All {attempts} attempted providers failed; last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<ProviderError>,
    },
}

/// Lock-free usage counters for one provider.
#[derive(Debug, Default)]
pub struct ProviderStats {
    total_requests: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    /// Sum of successful-call latencies.
    total_latency_ns: AtomicU64,
    /// Epoch millis of the last attempt; 0 means never.
    last_used_ms: AtomicI64,
}

impl ProviderStats {
    fn touch(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.last_used_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn record_success(&self, latency: Duration) {
        self.touch();
        self.success_count.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.touch();
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.success_count.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.total_latency_ns.store(0, Ordering::Relaxed);
        self.last_used_ms.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self, name: &str, health: Option<&HealthStatus>) -> ProviderStatsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let success = self.success_count.load(Ordering::Relaxed);
        let failure = self.failure_count.load(Ordering::Relaxed);
        let latency_ns = self.total_latency_ns.load(Ordering::Relaxed);
        let last_used_ms = self.last_used_ms.load(Ordering::Relaxed);

        ProviderStatsSnapshot {
            name: name.to_string(),
            total_requests: total,
            success_count: success,
            failure_count: failure,
            average_latency_ms: if success == 0 {
                0.0
            } else {
                latency_ns as f64 / success as f64 / 1_000_000.0
            },
            success_rate: if total == 0 {
                0.0
            } else {
                success as f64 / total as f64
            },
            last_used: (last_used_ms != 0)
                .then(|| DateTime::from_timestamp_millis(last_used_ms))
                .flatten(),
            available: health.is_some_and(|h| h.available),
            last_checked: health.and_then(|h| h.last_checked),
        }
    }
}

/// Result of the most recent availability probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub available: bool,
    /// `None` until the first health check.
    pub last_checked: Option<DateTime<Utc>>,
}

/// Point-in-time view of one provider's statistics and health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatsSnapshot {
    pub name: String,
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Mean latency of successful calls.
    pub average_latency_ms: f64,
    pub success_rate: f64,
    pub last_used: Option<DateTime<Utc>>,
    pub available: bool,
    pub last_checked: Option<DateTime<Utc>>,
}

#[derive(Clone)]
struct Registered {
    provider: Arc<Provider>,
    stats: Arc<ProviderStats>,
}

impl Registered {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn attempt(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ProviderError> {
        let started = Instant::now();
        match self.provider.analyze(request).await {
            Ok(result) => {
                self.stats.record_success(started.elapsed());
                Ok(result)
            }
            Err(e) => {
                self.stats.record_failure();
                tracing::warn!(
                    provider = %self.name(),
                    kind = ?e.kind(),
                    transient = e.is_transient(),
                    error = %e,
                    "Provider attempt failed"
                );
                Err(e)
            }
        }
    }
}

struct ManagerState {
    providers: Vec<Registered>,
    primary: Option<String>,
    fallback_enabled: bool,
    health: HashMap<String, HealthStatus>,
    health_check_interval: Option<Duration>,
}

pub struct Manager {
    state: RwLock<ManagerState>,
}

impl Manager {
    pub fn new(fallback_enabled: bool) -> Self {
        Self {
            state: RwLock::new(ManagerState {
                providers: Vec::new(),
                primary: None,
                fallback_enabled,
                health: HashMap::new(),
                health_check_interval: None,
            }),
        }
    }

    /// Build every configured provider and apply the manager settings.
    ///
    /// With the cache enabled, each provider gets its own cache.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let manager = Self::new(config.manager.fallback_enabled);
        for provider_config in &config.providers {
            let provider = build_provider(provider_config)?;
            let provider = if config.cache.enabled {
                CachedProvider::new(provider, config.cache.cache_config()).into()
            } else {
                provider
            };
            manager.register(provider)?;
        }

        manager.apply_priority(&config.manager.priority);
        if let Some(primary) = &config.manager.default_provider {
            manager.set_primary(primary)?;
        }
        manager.set_health_check_interval(config.manager.health_check_interval);

        tracing::info!(
            providers = ?manager.provider_names(),
            primary = ?manager.primary_name(),
            fallback_enabled = config.manager.fallback_enabled,
            cache_enabled = config.cache.enabled,
            health_check_interval = ?config.manager.health_check_interval,
            "Manager configured"
        );
        Ok(manager)
    }

    /// Append a provider. Names must be unique.
    pub fn register(&self, provider: impl Into<Provider>) -> Result<(), ManagerError> {
        let provider = provider.into();
        let name = provider.name().to_string();

        let mut state = self.state.write();
        if state.providers.iter().any(|r| r.name() == name) {
            return Err(ManagerError::DuplicateProvider(name));
        }

        state.health.insert(name.clone(), HealthStatus::default());
        state.providers.push(Registered {
            provider: Arc::new(provider),
            stats: Arc::new(ProviderStats::default()),
        });

        tracing::debug!(provider = %name, "Registered provider");
        Ok(())
    }

    /// Provider names in current priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.state
            .read()
            .providers
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pin the primary provider by name.
    pub fn set_primary(&self, name: &str) -> Result<(), ManagerError> {
        let mut state = self.state.write();
        if !state.providers.iter().any(|r| r.name() == name) {
            return Err(ManagerError::UnknownProvider(name.to_string()));
        }
        state.primary = Some(name.to_string());
        tracing::info!(provider = %name, "Primary provider set");
        Ok(())
    }

    /// Return to automatic primary selection.
    pub fn clear_primary(&self) {
        self.state.write().primary = None;
    }

    /// The explicitly pinned primary, if any.
    pub fn primary_name(&self) -> Option<String> {
        self.state.read().primary.clone()
    }

    /// The provider `analyze` would try first: the pinned primary, or the
    /// first available provider in priority order.
    pub async fn select_primary(&self) -> Option<String> {
        let (providers, primary) = self.snapshot();
        if primary.is_some() {
            return primary;
        }
        Self::first_available(&providers)
            .await
            .map(|idx| providers[idx].name().to_string())
    }

    /// Move the named providers to the front, in the given order. Unlisted
    /// providers keep their relative order behind them.
    pub fn apply_priority<S: AsRef<str>>(&self, priority: &[S]) {
        let mut state = self.state.write();

        let mut rest = std::mem::take(&mut state.providers);
        let mut ordered = Vec::with_capacity(rest.len());

        for name in priority.iter().map(AsRef::as_ref) {
            match rest.iter().position(|r| r.name() == name) {
                Some(pos) => ordered.push(rest.remove(pos)),
                None if ordered.iter().any(|r: &Registered| r.name() == name) => {}
                None => tracing::warn!(provider = %name, "Priority names an unknown provider"),
            }
        }
        ordered.extend(rest);
        state.providers = ordered;

        tracing::debug!(
            order = ?state.providers.iter().map(Registered::name).collect::<Vec<_>>(),
            "Applied provider priority"
        );
    }

    pub fn set_fallback_enabled(&self, enabled: bool) {
        self.state.write().fallback_enabled = enabled;
    }

    pub fn fallback_enabled(&self) -> bool {
        self.state.read().fallback_enabled
    }

    /// Interval used by [`start_configured_health_checks`](Self::start_configured_health_checks).
    pub fn set_health_check_interval(&self, interval: Option<Duration>) {
        self.state.write().health_check_interval = interval;
    }

    pub fn health_check_interval(&self) -> Option<Duration> {
        self.state.read().health_check_interval
    }

    fn snapshot(&self) -> (Vec<Registered>, Option<String>) {
        let state = self.state.read();
        (state.providers.clone(), state.primary.clone())
    }

    async fn first_available(providers: &[Registered]) -> Option<usize> {
        for (idx, registered) in providers.iter().enumerate() {
            if registered.provider.is_available().await {
                return Some(idx);
            }
        }
        None
    }

    /// Analyze with the primary provider, falling back through the rest of
    /// the list in order when enabled.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ManagerError> {
        let (providers, pinned, fallback_enabled) = {
            let state = self.state.read();
            (
                state.providers.clone(),
                state.primary.clone(),
                state.fallback_enabled,
            )
        };

        if providers.is_empty() {
            return Err(ManagerError::NoProviders);
        }

        // A pinned primary is attempted without an availability probe.
        let primary_idx = match pinned.and_then(|name| providers.iter().position(|r| r.name() == name)) {
            Some(idx) => idx,
            None => Self::first_available(&providers)
                .await
                .ok_or(ManagerError::NoAvailableProvider)?,
        };

        let primary = &providers[primary_idx];
        tracing::debug!(provider = %primary.name(), "Using primary provider");

        let mut last_error = match primary.attempt(request).await {
            Ok(result) => return Ok(result),
            Err(e) if !fallback_enabled => {
                return Err(ManagerError::Provider {
                    provider: primary.name().to_string(),
                    source: e,
                })
            }
            Err(e) => e,
        };
        let mut attempts = 1;

        for (idx, registered) in providers.iter().enumerate() {
            if idx == primary_idx {
                continue;
            }
            if !registered.provider.is_available().await {
                tracing::debug!(provider = %registered.name(), "Skipping unavailable provider");
                continue;
            }

            attempts += 1;
            match registered.attempt(request).await {
                Ok(result) => {
                    tracing::info!(
                        provider = %registered.name(),
                        primary = %primary.name(),
                        attempts,
                        "Fallback provider succeeded"
                    );
                    return Ok(result);
                }
                Err(e) => last_error = e,
            }
        }

        Err(ManagerError::Exhausted {
            attempts,
            last: Box::new(last_error),
        })
    }

    /// Statistics for every provider, in priority order.
    pub fn stats(&self) -> Vec<ProviderStatsSnapshot> {
        let state = self.state.read();
        state
            .providers
            .iter()
            .map(|r| r.stats.snapshot(r.name(), state.health.get(r.name())))
            .collect()
    }

    pub fn provider_stats(&self, name: &str) -> Option<ProviderStatsSnapshot> {
        let state = self.state.read();
        state
            .providers
            .iter()
            .find(|r| r.name() == name)
            .map(|r| r.stats.snapshot(r.name(), state.health.get(name)))
    }

    pub fn reset_stats(&self) {
        for registered in &self.state.read().providers {
            registered.stats.reset();
        }
    }

    /// Cache statistics for every provider wrapped in a cache.
    pub fn cache_stats(&self) -> BTreeMap<String, CacheStats> {
        self.state
            .read()
            .providers
            .iter()
            .filter_map(|r| {
                r.provider
                    .as_cached()
                    .map(|cached| (r.name().to_string(), cached.cache().stats()))
            })
            .collect()
    }

    /// Clear every provider cache.
    pub fn clear_caches(&self) {
        for registered in &self.state.read().providers {
            if let Some(cached) = registered.provider.as_cached() {
                cached.cache().clear();
            }
        }
    }

    /// The most recent health snapshot.
    pub fn health_status(&self) -> HashMap<String, HealthStatus> {
        self.state.read().health.clone()
    }

    /// Probe every provider concurrently and refresh the health map.
    pub async fn check_health(&self) -> HashMap<String, HealthStatus> {
        let (providers, _) = self.snapshot();

        let probes = providers.iter().map(|r| async move {
            (r.name().to_string(), r.provider.is_available().await)
        });
        let results = futures::future::join_all(probes).await;
        let checked_at = Utc::now();

        let mut state = self.state.write();
        for (name, available) in results {
            let previous = state.health.get(&name).copied().unwrap_or_default();
            if previous.last_checked.is_none() || previous.available != available {
                tracing::info!(provider = %name, available, "Provider availability changed");
            }
            state.health.insert(
                name,
                HealthStatus {
                    available,
                    last_checked: Some(checked_at),
                },
            );
        }
        state.health.clone()
    }

    /// Run [`check_health`](Self::check_health) every `interval` until the
    /// returned handle is stopped or dropped, or the manager is dropped.
    pub fn start_health_checks(self: &Arc<Self>, interval: Duration) -> HealthCheckHandle {
        let manager: Weak<Self> = Arc::downgrade(self);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let Some(manager) = manager.upgrade() else {
                            break;
                        };
                        manager.check_health().await;
                    }
                }
            }
            tracing::debug!("Health check loop stopped");
        });

        HealthCheckHandle {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Start periodic health checks at the configured interval, if any.
    pub fn start_configured_health_checks(self: &Arc<Self>) -> Option<HealthCheckHandle> {
        let interval = self.health_check_interval()?;
        tracing::info!(interval = ?interval, "Starting periodic health checks");
        Some(self.start_health_checks(interval))
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Manager")
            .field(
                "providers",
                &state.providers.iter().map(Registered::name).collect::<Vec<_>>(),
            )
            .field("primary", &state.primary)
            .field("fallback_enabled", &state.fallback_enabled)
            .finish()
    }
}

/// Handle to a periodic health-check task. Dropping it aborts the task.
#[derive(Debug)]
pub struct HealthCheckHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl HealthCheckHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for HealthCheckHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
