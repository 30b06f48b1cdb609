//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::retry::{RetryPolicy, MAX_BACKOFF_MS};

use super::Config;

/// Upper bound on caption candidates per run.
pub const MAX_CANDIDATES: usize = 8;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let workflow = &self.workflow;
        if workflow.num_candidates == 0 || workflow.num_candidates > MAX_CANDIDATES {
            return Err(ConfigError::ValidationError(format!(
                "workflow.num_candidates must be between 1 and {MAX_CANDIDATES}"
            )));
        }
        if workflow.retry_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.retry_delay_ms must be > 0".into(),
            ));
        }
        let retry = RetryPolicy::new(workflow.max_retries_per_stage, workflow.retry_delay_ms);
        if !retry.fits_backoff_cap() {
            return Err(ConfigError::ValidationError(format!(
                "workflow.retry_delay_ms * 2^(max_retries_per_stage - 1) must not exceed \
                 {MAX_BACKOFF_MS}ms (got {}ms with {} retries)",
                workflow.retry_delay_ms, workflow.max_retries_per_stage
            )));
        }
        if workflow.fallback_providers.contains(&workflow.llm_provider) {
            return Err(ConfigError::ValidationError(format!(
                "workflow.fallback_providers must not repeat the primary provider ({})",
                workflow.llm_provider
            )));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.catalog_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.catalog_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.render_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.render_timeout_ms must be > 0".into(),
            ));
        }
        if self.catalog.max_prompt_templates == 0 {
            return Err(ConfigError::ValidationError(
                "catalog.max_prompt_templates must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "llm.max_tokens must be > 0".into(),
            ));
        }
        Ok(())
    }
}
