//! Provider construction from configuration.
//!
//! The provider set is closed, so configuration is a tagged enum rather
//! than a registry of factories:
//!
//! ```yaml
//! - type: rule_based
//! - type: generic_http
//!   name: scorer
//!   endpoint: https://scoring.example.com/v1/analyze
//! - type: fallback_chain
//!   name: remote_then_local
//!   deadline: 45s
//!   providers:
//!     - type: network_generate
//!     - type: rule_based
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::generic_http::{GenericHttpConfig, GenericHttpProvider};
use super::network_generate::{NetworkGenerateConfig, NetworkGenerateProvider};
use super::rule_based::{RuleBasedProvider, RULE_BASED_PROVIDER_NAME};
use super::template::RequestTemplate;
use super::{Provider, ProviderError};
use crate::config::humantime_option;
use crate::resilience::{FallbackProvider, DEFAULT_FALLBACK_NAME};

fn default_rule_based_name() -> String {
    RULE_BASED_PROVIDER_NAME.to_string()
}

fn default_fallback_name() -> String {
    DEFAULT_FALLBACK_NAME.to_string()
}

/// Configuration for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    RuleBased {
        #[serde(default = "default_rule_based_name")]
        name: String,
    },

    NetworkGenerate(NetworkGenerateConfig),

    GenericHttp(GenericHttpConfig),

    FallbackChain {
        #[serde(default = "default_fallback_name")]
        name: String,

        providers: Vec<ProviderConfig>,

        #[serde(default, with = "humantime_option", skip_serializing_if = "Option::is_none")]
        deadline: Option<Duration>,
    },
}

impl ProviderConfig {
    pub fn name(&self) -> &str {
        match self {
            ProviderConfig::RuleBased { name } => name,
            ProviderConfig::NetworkGenerate(config) => &config.name,
            ProviderConfig::GenericHttp(config) => &config.name,
            ProviderConfig::FallbackChain { name, .. } => name,
        }
    }

    /// Static checks that don't touch the network or the environment.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.name().trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "provider name must not be empty".to_string(),
            ));
        }

        match self {
            ProviderConfig::RuleBased { .. } => Ok(()),
            ProviderConfig::NetworkGenerate(config) => {
                if config.base_url.trim().is_empty() {
                    return Err(ProviderError::NotConfigured(format!(
                        "provider '{}': base_url must not be empty",
                        config.name
                    )));
                }
                if config.timeout_secs == 0 {
                    return Err(ProviderError::NotConfigured(format!(
                        "provider '{}': timeout_secs must be positive",
                        config.name
                    )));
                }
                Ok(())
            }
            ProviderConfig::GenericHttp(config) => {
                if config.endpoint.trim().is_empty() {
                    return Err(ProviderError::NotConfigured(format!(
                        "provider '{}': endpoint must not be empty",
                        config.name
                    )));
                }
                if config.timeout_secs == 0 {
                    return Err(ProviderError::NotConfigured(format!(
                        "provider '{}': timeout_secs must be positive",
                        config.name
                    )));
                }
                if let Some(template) = &config.template {
                    RequestTemplate::compile(template)?;
                }
                Ok(())
            }
            ProviderConfig::FallbackChain {
                name,
                providers,
                deadline,
            } => {
                if providers.is_empty() {
                    return Err(ProviderError::NotConfigured(format!(
                        "fallback chain '{}' has no providers",
                        name
                    )));
                }
                if deadline.is_some_and(|d| d.is_zero()) {
                    return Err(ProviderError::NotConfigured(format!(
                        "fallback chain '{}': deadline must be positive",
                        name
                    )));
                }
                providers.iter().try_for_each(ProviderConfig::validate)
            }
        }
    }
}

/// Build a provider (recursively, for chains) from configuration.
pub fn build_provider(config: &ProviderConfig) -> Result<Provider, ProviderError> {
    let provider: Provider = match config {
        ProviderConfig::RuleBased { name } => RuleBasedProvider::with_name(name.as_str()).into(),
        ProviderConfig::NetworkGenerate(config) => NetworkGenerateProvider::new(config)?.into(),
        ProviderConfig::GenericHttp(config) => GenericHttpProvider::new(config)?.into(),
        ProviderConfig::FallbackChain {
            name,
            providers,
            deadline,
        } => {
            let members = providers
                .iter()
                .map(build_provider)
                .collect::<Result<Vec<_>, _>>()?;
            let chain = FallbackProvider::new(members).with_name(name.as_str());
            match deadline {
                Some(deadline) => chain.with_deadline(*deadline).into(),
                None => chain.into(),
            }
        }
    };

    tracing::debug!(
        provider = %config.name(),
        kind = provider.kind(),
        "Built provider"
    );
    Ok(provider)
}
