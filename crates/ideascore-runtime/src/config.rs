//! Runtime configuration.
//!
//! Loaded from YAML and validated before any provider is built:
//!
//! ```yaml
//! providers:
//!   - type: generic_http
//!     name: scorer
//!     endpoint: https://scoring.example.com/v1/analyze
//!     headers:
//!       Authorization: "Bearer ${SCORER_TOKEN}"
//!   - type: rule_based
//! cache:
//!   ttl: 1h
//!   similarity_threshold: 0.5
//!   max_size: 1000
//! manager:
//!   priority: [scorer, rule_based]
//!   fallback_enabled: true
//!   health_check_interval: 30s
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheConfig, DEFAULT_MAX_SIZE, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TTL};
use crate::manager::ManagerError;
use crate::providers::{ProviderConfig, ProviderError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {0}")]
    Invalid(String),

    #[error("Provider config error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Manager setup failed: {0}")]
    Manager(#[from] ManagerError),
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> Duration {
    DEFAULT_TTL
}

fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_max_size() -> usize {
    DEFAULT_MAX_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ttl", with = "humantime_duration")]
    pub ttl: Duration,

    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_TTL,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl CacheSettings {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.ttl,
            similarity_threshold: self.similarity_threshold,
            max_size: self.max_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSettings {
    /// Provider names to move to the front, in order.
    #[serde(default)]
    pub priority: Vec<String>,

    /// Explicit primary. When absent the first available provider is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    #[serde(default = "default_true")]
    pub fallback_enabled: bool,

    #[serde(default, with = "humantime_option", skip_serializing_if = "Option::is_none")]
    pub health_check_interval: Option<Duration>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            priority: Vec::new(),
            default_provider: None,
            fallback_enabled: true,
            health_check_interval: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub manager: ManagerSettings,
}

impl RuntimeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one provider must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate provider name '{}'",
                    provider.name()
                )));
            }
            provider.validate()?;
        }

        let threshold = self.cache.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "cache.similarity_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.cache.max_size == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_size must be positive".to_string(),
            ));
        }
        if self.cache.ttl.is_zero() {
            return Err(ConfigError::Invalid("cache.ttl must be positive".to_string()));
        }

        if let Some(default) = &self.manager.default_provider {
            if !seen.contains(default.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "manager.default_provider '{}' is not a configured provider",
                    default
                )));
            }
        }
        if self.manager.health_check_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Invalid(
                "manager.health_check_interval must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Serde adapter for `Duration` as a humantime string ("30s", "1h 30m").
pub(crate) mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Same as [`humantime_duration`], for optional fields.
pub(crate) mod humantime_option {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
providers:
  - type: rule_based
  - type: network_generate
    name: ollama
  - type: generic_http
    name: scorer
    endpoint: https://scoring.example.com/v1/analyze
    template: '{"text": {{ idea | json }}}'
    timeout_secs: 20
cache:
  enabled: true
  ttl: 30m
  similarity_threshold: 0.7
  max_size: 50
manager:
  priority: [scorer, ollama]
  default_provider: scorer
  fallback_enabled: false
  health_check_interval: 15s
"#;

    #[test]
    fn test_full_config_parses() {
        let config = RuntimeConfig::from_yaml(FULL).unwrap();
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.cache.ttl, Duration::from_secs(1800));
        assert_eq!(config.cache.similarity_threshold, 0.7);
        assert_eq!(config.cache.cache_config().max_size, 50);
        assert_eq!(config.manager.priority, vec!["scorer", "ollama"]);
        assert_eq!(config.manager.default_provider.as_deref(), Some("scorer"));
        assert!(!config.manager.fallback_enabled);
        assert_eq!(
            config.manager.health_check_interval,
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::from_yaml("providers:\n  - type: rule_based\n").unwrap();
        assert_eq!(config.cache, CacheSettings::default());
        assert_eq!(config.manager, ManagerSettings::default());
        assert!(config.cache.enabled);
        assert!(config.manager.fallback_enabled);
    }

    #[test]
    fn test_validation_rejections() {
        let cases = [
            "providers: []",
            "providers:\n  - type: rule_based\n  - type: rule_based\n",
            "providers:\n  - type: generic_http\n    name: s\n    endpoint: ''\n",
            "providers:\n  - type: rule_based\ncache:\n  similarity_threshold: 0\n",
            "providers:\n  - type: rule_based\ncache:\n  similarity_threshold: 1.5\n",
            "providers:\n  - type: rule_based\ncache:\n  max_size: 0\n",
            "providers:\n  - type: rule_based\ncache:\n  ttl: 0s\n",
            "providers:\n  - type: rule_based\nmanager:\n  default_provider: missing\n",
        ];

        for yaml in cases {
            assert!(
                RuntimeConfig::from_yaml(yaml).is_err(),
                "expected rejection for:\n{yaml}"
            );
        }
    }

    #[test]
    fn test_bad_duration_is_yaml_error() {
        let err = RuntimeConfig::from_yaml("providers:\n  - type: rule_based\ncache:\n  ttl: soon\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_round_trip_serialization_keeps_durations_readable() {
        let config = RuntimeConfig::from_yaml(FULL).unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("ttl: 30m"));
        assert_eq!(RuntimeConfig::from_yaml(&yaml).unwrap(), config);
    }
}
