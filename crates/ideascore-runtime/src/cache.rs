//! Similarity cache for analysis results.
//!
//! Keys are normalized token sets, so "build automation tool" and
//! "automation tool build" share an entry. A lookup that misses the exact
//! key falls back to the most similar live entry by Jaccard similarity, and
//! hits if that similarity reaches the configured threshold.
//!
//! Entries expire lazily after the TTL and are evicted least-recently-used
//! first once the cache is full. All counters are updated under the write
//! lock, so concurrent lookups never lose a count.

use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

use ideascore_core::AnalysisResult;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MAX_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub similarity_threshold: f64,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

/// Case-folded alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity `|a ∩ b| / |a ∪ b|`. Two empty sets score 0.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn cache_key(tokens: &BTreeSet<String>) -> String {
    tokens.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
struct CacheEntry {
    tokens: BTreeSet<String>,
    result: AnalysisResult,
    created_at: Instant,
    hits: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }
}

struct CacheState {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub hit_rate: f64,
    pub evictions: u64,
    pub expirations: u64,
}

pub struct SimilarityCache {
    config: CacheConfig,
    state: RwLock<CacheState>,
}

impl SimilarityCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            state: RwLock::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a result for `text`.
    ///
    /// The returned result is marked `from_cache`.
    pub fn get(&self, text: &str) -> Option<AnalysisResult> {
        let tokens = tokenize(text);
        let key = cache_key(&tokens);
        let now = Instant::now();
        let ttl = self.config.ttl;

        // Scan under the read lock so concurrent lookups don't serialize.
        let (candidate, expired) = {
            let state = self.state.read();
            let mut expired = Vec::new();
            let mut best: Option<(String, f64)> = None;

            for (entry_key, entry) in state.entries.iter() {
                if entry.is_expired(now, ttl) {
                    expired.push(entry_key.clone());
                    continue;
                }
                let similarity = if *entry_key == key {
                    1.0
                } else {
                    jaccard(&tokens, &entry.tokens)
                };
                if similarity >= self.config.similarity_threshold
                    && best.as_ref().map_or(true, |(_, s)| similarity > *s)
                {
                    best = Some((entry_key.clone(), similarity));
                }
            }
            (best, expired)
        };

        let mut guard = self.state.write();
        let state = &mut *guard;

        for entry_key in expired {
            let still_expired = state
                .entries
                .peek(&entry_key)
                .is_some_and(|e| e.is_expired(now, ttl));
            if still_expired {
                state.entries.pop(&entry_key);
                state.expirations += 1;
                tracing::debug!(key = %entry_key, "Cache entry expired");
            }
        }

        if let Some((entry_key, similarity)) = candidate {
            // Re-check: the entry may have been evicted since the scan.
            if let Some(entry) = state.entries.get_mut(&entry_key) {
                entry.hits += 1;
                state.hits += 1;

                let mut result = entry.result.clone();
                result.from_cache = true;

                tracing::debug!(
                    key = %entry_key,
                    similarity,
                    entry_hits = entry.hits,
                    "Cache hit"
                );
                return Some(result);
            }
        }

        state.misses += 1;
        tracing::debug!(key = %key, "Cache miss");
        None
    }

    /// Store a result under the normalized form of `text`.
    pub fn store(&self, text: &str, result: AnalysisResult) {
        let tokens = tokenize(text);
        let key = cache_key(&tokens);

        let entry = CacheEntry {
            tokens,
            result,
            created_at: Instant::now(),
            hits: 0,
        };

        let mut state = self.state.write();
        if let Some((evicted_key, _)) = state.entries.push(key.clone(), entry) {
            if evicted_key != key {
                state.evictions += 1;
                tracing::debug!(key = %evicted_key, "Evicted least-recently-used cache entry");
            }
        }
    }

    /// Drop every entry and reset all counters.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.hits = 0;
        state.misses = 0;
        state.evictions = 0;
        state.expirations = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        let lookups = state.hits + state.misses;
        CacheStats {
            size: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                state.hits as f64 / lookups as f64
            },
            evictions: state.evictions,
            expirations: state.expirations,
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SimilarityCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl fmt::Debug for SimilarityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
