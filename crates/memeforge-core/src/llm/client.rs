//! Uniform LLM client over an ordered chain of providers.
//!
//! The first provider is the configured primary; the rest are fallbacks that
//! are only tried when the previous one fails at the network/auth level.
//! Parse failures are returned immediately: repairing them is the calling
//! stage's job, with a corrective prompt.

use super::prompt::StructuredPrompt;
use super::provider::{LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse};
use super::schema::{parse_response, ResponseSchema};
use crate::config::Config;
use crate::error::WorkflowError;
use std::sync::Arc;
use std::time::Duration;

/// LLM client that hides provider identity from the workflow.
#[derive(Clone)]
pub struct LlmClient {
    providers: Vec<Arc<dyn LlmProvider>>,
    timeout: Duration,
    max_tokens: u32,
    temperature: f32,
}

impl LlmClient {
    pub fn new(primary: Box<dyn LlmProvider>) -> Self {
        Self {
            providers: vec![Arc::from(primary)],
            timeout: Duration::from_secs(60),
            max_tokens: 400,
            temperature: 0.7,
        }
    }

    /// Append a provider to try when every earlier one has failed.
    pub fn with_fallback(mut self, provider: Box<dyn LlmProvider>) -> Self {
        self.providers.push(Arc::from(provider));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Build the provider chain described by `[workflow]` and `[llm]`.
    ///
    /// The primary must be constructible; a fallback that cannot be built
    /// (usually a missing API key) is skipped with a warning.
    pub fn from_config(config: &Config) -> Result<Self, WorkflowError> {
        let workflow = &config.workflow;
        let primary = LlmProviderFactory::create(
            workflow.llm_provider,
            &config.llm,
            workflow.llm_model.as_deref(),
        )?;

        let mut client = Self::new(primary)
            .with_timeout(Duration::from_millis(config.limits.llm_timeout_ms))
            .with_sampling(config.llm.max_tokens, config.llm.temperature);

        for kind in &workflow.fallback_providers {
            match LlmProviderFactory::create(*kind, &config.llm, None) {
                Ok(provider) => client = client.with_fallback(provider),
                Err(e) => tracing::warn!("Skipping fallback provider {kind}: {e}"),
            }
        }

        Ok(client)
    }

    /// Names of the providers in the order they are tried.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Ask for a `T`-shaped answer to `prompt` and parse it.
    ///
    /// Fails with [`WorkflowError::Parse`] if the text does not match `T`,
    /// or with the last provider error if every provider failed.
    pub async fn complete<T: ResponseSchema>(
        &self,
        prompt: &StructuredPrompt,
    ) -> Result<T, WorkflowError> {
        let request = self.build_request::<T>(prompt);
        let response = self.generate(&request).await?;
        tracing::debug!(
            schema = T::NAME,
            model = %response.model,
            latency_ms = response.latency_ms,
            "LLM response received"
        );
        parse_response::<T>(&response.text)
    }

    fn build_request<T: ResponseSchema>(&self, prompt: &StructuredPrompt) -> LlmRequest {
        LlmRequest {
            system: prompt.system.clone(),
            prompt: prompt.render(&T::format_instructions()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            json_mode: true,
        }
    }

    /// Send a raw request down the provider chain.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, WorkflowError> {
        let mut last_error = None;

        for (position, provider) in self.providers.iter().enumerate() {
            if position > 0 {
                tracing::info!("Falling back to LLM provider {}", provider.name());
            }

            match tokio::time::timeout(self.timeout, provider.generate(request)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    tracing::warn!("LLM provider {} failed: {e}", provider.name());
                    last_error = Some(e);
                }
                Err(_) => {
                    let e = WorkflowError::Timeout {
                        operation: format!("{} completion", provider.name()),
                        timeout_ms: self.timeout.as_millis() as u64,
                    };
                    tracing::warn!("{e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| WorkflowError::Provider {
            message: "No LLM providers configured".to_string(),
            status_code: None,
        }))
    }
}
