//! Local generation-service provider (Ollama-compatible API).
//!
//! Liveness is a bounded `GET /api/tags`; analysis is a single
//! non-streaming `POST /api/generate` whose `response` text is parsed by
//! [`parse_analysis_response`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use ideascore_core::{AnalysisRequest, AnalysisResult};

use super::{truncate_body, AnalysisProvider, ProviderError};
use crate::prompts::{build_analysis_prompt, parse_analysis_response, ANALYSIS_SYSTEM_PROMPT};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 60;

/// Upper bound on the liveness probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

fn default_name() -> String {
    "network_generate".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_GENERATE_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkGenerateConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NetworkGenerateConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NetworkGenerateConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug)]
pub struct NetworkGenerateProvider {
    name: String,
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl NetworkGenerateProvider {
    pub fn new(config: &NetworkGenerateConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AnalysisProvider for NetworkGenerateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        let probe = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match probe {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(provider = %self.name, error = %e, "Liveness probe failed");
                false
            }
        }
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ProviderError> {
        let started = Instant::now();

        let body = GenerateRequest {
            model: &self.model,
            prompt: build_analysis_prompt(request),
            system: ANALYSIS_SYSTEM_PROMPT,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| ProviderError::from_transport(e, self.timeout))?;
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let result = parse_analysis_response(&generated.response)?;
        let elapsed = started.elapsed();

        tracing::debug!(
            provider = %self.name,
            model = %self.model,
            elapsed_ms = elapsed.as_millis() as u64,
            "Generation analysis complete"
        );

        Ok(result.with_provider(self.name.as_str()).with_duration(elapsed))
    }
}
