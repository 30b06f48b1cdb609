//! Retry utilities for transient failures.
//!
//! Provides classification of retryable errors, exponential backoff, and the
//! bounded [`RetryPolicy`] shared by the catalog fetch and render stage.

use crate::error::{RenderError, WorkflowError};
use std::time::Duration;

/// Upper bound for any single backoff sleep.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Determine whether an error is worth retrying.
///
/// Retryable errors: timeouts, rate limits (429), server errors (5xx),
/// connection failures, malformed LLM output, transient render failures.
/// Non-retryable: auth failures, bad requests, invalid templates.
pub fn is_retryable(error: &WorkflowError) -> bool {
    match error {
        WorkflowError::Timeout { .. } => true,
        WorkflowError::Parse { .. } => true,
        WorkflowError::Provider {
            status_code,
            message,
        } => {
            // Classify by HTTP status code when available (structured)
            if let Some(code) = status_code {
                return is_retryable_status(*code);
            }
            // Fallback for non-HTTP errors (e.g., connection refused, DNS failure)
            message.contains("timed out") || message.contains("connect")
        }
        WorkflowError::Render(RenderError::Transient { .. }) => true,
        _ => false,
    }
}

/// HTTP statuses that indicate a transient condition.
pub fn is_retryable_status(code: u16) -> bool {
    code == 429 || (500..=599).contains(&code)
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(MAX_BACKOFF_MS))
}

/// Bounded retry budget for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total calls = `max_retries + 1`)
    pub max_retries: u32,

    /// Delay before the first retry; doubles for each following retry
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep to take before retry number `retry` (1-based).
    pub fn delay_before(&self, retry: u32) -> Duration {
        backoff_duration(retry.saturating_sub(1), self.base_delay_ms)
    }

    /// Whether the last retry's uncapped delay stays within [`MAX_BACKOFF_MS`],
    /// so that every delay in the schedule is strictly larger than the one
    /// before it.
    pub fn fits_backoff_cap(&self) -> bool {
        if self.max_retries == 0 {
            return true;
        }
        2u64.checked_pow(self.max_retries - 1)
            .and_then(|factor| self.base_delay_ms.checked_mul(factor))
            .is_some_and(|last| last <= MAX_BACKOFF_MS)
    }

    /// Every delay this policy would sleep, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|r| self.delay_before(r)).collect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1000)
    }
}
