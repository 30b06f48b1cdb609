//! LLM provider trait and request/response types.
//!
//! Defines the interface that all LLM providers implement, plus the
//! factory that creates the right provider from config.

use crate::config::{LlmConfig, ProviderKind};
use crate::error::WorkflowError;
use async_trait::async_trait;
use std::time::Duration;

/// A single text-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    /// System instruction (role, rules)
    pub system: String,
    /// User-turn prompt text
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Ask the backend to constrain output to a JSON object when it can
    pub json_mode: bool,
}

impl LlmRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: 400,
            temperature: 0.7,
            json_mode: true,
        }
    }
}

/// The response from an LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn LlmProvider>` for dynamic dispatch).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "anthropic", "ollama").
    fn name(&self) -> &str;

    /// Check whether the provider is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Generate a completion for the given request.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, WorkflowError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the appropriate provider from config.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider for `kind`.
    ///
    /// # Arguments
    /// * `kind` - Which backend to build
    /// * `config` - The full LLM config section
    /// * `model_override` - Optional model name that overrides the config default
    pub fn create(
        kind: ProviderKind,
        config: &LlmConfig,
        model_override: Option<&str>,
    ) -> Result<Box<dyn LlmProvider>, WorkflowError> {
        match kind {
            ProviderKind::Ollama => {
                let cfg = config.ollama.clone().unwrap_or_default();
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::ollama::OllamaProvider::new(
                    &cfg.endpoint,
                    &model,
                )))
            }
            ProviderKind::Anthropic => {
                let cfg = config.anthropic.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| missing_key(kind))?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key, &model,
                )))
            }
            ProviderKind::Openai => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| missing_key(kind))?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &api_key, &model,
                )))
            }
            ProviderKind::Hyperbolic => {
                let cfg = config.hyperbolic.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| missing_key(kind))?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::hyperbolic::HyperbolicProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    &model,
                )))
            }
        }
    }
}

fn missing_key(kind: ProviderKind) -> WorkflowError {
    let env = kind.api_key_env().unwrap_or("the provider API key");
    WorkflowError::Provider {
        message: format!("{kind} API key not set. Set {env} or add it under [llm.{kind}]."),
        status_code: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnthropicConfig;

    #[test]
    fn test_request_defaults_to_json_mode() {
        let request = LlmRequest::new("system", "prompt");
        assert!(request.json_mode);
        assert_eq!(request.max_tokens, 400);
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_factory_ollama_needs_no_key() {
        let provider =
            LlmProviderFactory::create(ProviderKind::Ollama, &LlmConfig::default(), None).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_factory_missing_key_names_env_var() {
        let mut config = LlmConfig::default();
        config.anthropic = Some(AnthropicConfig {
            api_key: "${DEFINITELY_NOT_SET_XYZ_456}".to_string(),
            model: "claude-test".to_string(),
        });
        let err = match LlmProviderFactory::create(ProviderKind::Anthropic, &config, None) {
            Err(e) => e,
            Ok(_) => panic!("expected missing key error"),
        };
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_factory_literal_key() {
        let mut config = LlmConfig::default();
        config.anthropic = Some(AnthropicConfig {
            api_key: "sk-ant-literal".to_string(),
            model: "claude-test".to_string(),
        });
        let provider =
            LlmProviderFactory::create(ProviderKind::Anthropic, &config, Some("claude-override"))
                .unwrap();
        assert_eq!(provider.name(), "anthropic");
    }
}
