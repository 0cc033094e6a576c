//! Configurable HTTP scoring adapter.
//!
//! Lets any third-party scoring or LLM service that accepts a POST be used
//! as a provider without code changes:
//!
//! - the request body is a default JSON envelope or a configured
//!   [`RequestTemplate`]
//! - headers come from configuration, with `${VAR}` expansion, and are kept
//!   secret (see [`HeaderSet`])
//! - the response is parsed through the alias table in
//!   [`response`](super::response), with a text fallback for non-JSON bodies
//!
//! The provider never retries. Status errors carry the (truncated) body.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use ideascore_core::{AnalysisRequest, AnalysisResult};

use super::response::parse_body;
use super::secrets::HeaderSet;
use super::template::RequestTemplate;
use super::{truncate_body, AnalysisProvider, ProviderError};

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Configuration for a [`GenericHttpProvider`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericHttpConfig {
    pub name: String,

    #[serde(default)]
    pub endpoint: String,

    /// Header values may contain `${VAR}` references.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request-body template. When absent the default JSON envelope is sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GenericHttpConfig {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            headers: BTreeMap::new(),
            template: None,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug)]
pub struct GenericHttpProvider {
    name: String,
    endpoint: String,
    headers: HeaderSet,
    template: Option<RequestTemplate>,
    timeout: Duration,
    client: reqwest::Client,
}

impl GenericHttpProvider {
    /// Build from configuration.
    ///
    /// Fails if the template does not compile or a header references an
    /// unset environment variable. An empty endpoint is accepted; the
    /// provider then reports itself unavailable.
    pub fn new(config: &GenericHttpConfig) -> Result<Self, ProviderError> {
        let template = config
            .template
            .as_deref()
            .map(RequestTemplate::compile)
            .transpose()?;

        let headers = HeaderSet::from_config(&config.headers)?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        tracing::debug!(
            provider = %config.name,
            endpoint = %config.endpoint,
            headers = ?headers.names().collect::<Vec<_>>(),
            templated = template.is_some(),
            "Built generic HTTP provider"
        );

        Ok(Self {
            name: config.name.clone(),
            endpoint: config.endpoint.trim().to_string(),
            headers,
            template,
            timeout: config.timeout(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_body(&self, request: &AnalysisRequest) -> Result<Vec<u8>, ProviderError> {
        if let Some(template) = &self.template {
            return Ok(template.render(request)?);
        }

        let mut body = json!({ "idea": request.idea });
        if let Some(context) = &request.context {
            body["goals"] = json!(context.goals);
            body["strategies"] = json!(context.strategies);
            body["anti_patterns"] = json!(context.anti_patterns);
        }

        serde_json::to_vec(&body).map_err(|e| ProviderError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl AnalysisProvider for GenericHttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        !self.endpoint.is_empty()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ProviderError> {
        if self.endpoint.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "provider '{}' has no endpoint",
                self.name
            )));
        }

        let started = Instant::now();
        let body = self.build_body(request)?;

        let mut builder = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .body(body);

        if !self.headers.contains("content-type") {
            builder = builder.header("Content-Type", "application/json");
        }
        // SECURITY: header values are exposed only here
        for (name, value) in self.headers.iter() {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(e, self.timeout))?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let result = parse_body(&text)?;
        let elapsed = started.elapsed();

        tracing::debug!(
            provider = %self.name,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Generic HTTP analysis complete"
        );

        Ok(result.with_provider(self.name.as_str()).with_duration(elapsed))
    }
}
