//! Ordered fallback across providers.
//!
//! Members are tried one after another; the first success wins. Attempts
//! never overlap, so the latency up to the first success is the sum of the
//! attempted members' latencies.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use ideascore_core::{AnalysisRequest, AnalysisResult};

use crate::providers::{AnalysisProvider, Provider, ProviderError};

pub const DEFAULT_FALLBACK_NAME: &str = "fallback";

#[derive(Debug)]
pub struct FallbackProvider {
    name: String,
    providers: Vec<Provider>,
    deadline: Option<Duration>,
}

impl FallbackProvider {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self {
            name: DEFAULT_FALLBACK_NAME.to_string(),
            providers,
            deadline: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Bound the whole chain. Each attempt only gets the remaining budget.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    fn remaining(&self, started: Instant) -> Result<Option<Duration>, ProviderError> {
        match self.deadline {
            None => Ok(None),
            Some(deadline) => match deadline.checked_sub(started.elapsed()) {
                Some(left) if !left.is_zero() => Ok(Some(left)),
                _ => Err(ProviderError::DeadlineExceeded(deadline)),
            },
        }
    }
}

#[async_trait]
impl AnalysisProvider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        for provider in &self.providers {
            if provider.is_available().await {
                return true;
            }
        }
        false
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ProviderError> {
        let started = Instant::now();
        let mut attempts = 0;
        let mut last_error = None;

        for provider in &self.providers {
            let available = match self.remaining(started)? {
                None => provider.is_available().await,
                Some(left) => tokio::time::timeout(left, provider.is_available())
                    .await
                    .map_err(|_| ProviderError::DeadlineExceeded(self.deadline.unwrap_or(left)))?,
            };
            if !available {
                tracing::debug!(
                    chain = %self.name,
                    provider = %provider.name(),
                    "Skipping unavailable provider"
                );
                continue;
            }

            let remaining = self.remaining(started)?;
            attempts += 1;

            let outcome = match remaining {
                None => provider.analyze(request).await,
                Some(left) => tokio::time::timeout(left, provider.analyze(request))
                    .await
                    .map_err(|_| {
                        ProviderError::DeadlineExceeded(self.deadline.unwrap_or(left))
                    })?,
            };

            match outcome {
                Ok(result) => {
                    if attempts > 1 {
                        tracing::info!(
                            chain = %self.name,
                            provider = %provider.name(),
                            attempts,
                            "Fallback provider succeeded"
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(
                        chain = %self.name,
                        provider = %provider.name(),
                        kind = ?e.kind(),
                        transient = e.is_transient(),
                        error = %e,
                        "Provider failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(ProviderError::Exhausted {
                attempts,
                last: Box::new(last),
            }),
            None => Err(ProviderError::NoProvidersAvailable),
        }
    }
}
