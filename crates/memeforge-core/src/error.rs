//! Error types for the memeforge workflow.
//!
//! Errors are organized by concern: configuration, workflow stages, and the
//! renderer's own failure classes. [`ErrorRecord`] is the flattened,
//! serializable form handed to callers when a run fails.

use crate::types::Stage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for memeforge operations.
#[derive(Error, Debug)]
pub enum MemeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Workflow / adapter errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while running a workflow stage or calling an external service.
#[derive(Error, Debug, Clone)]
pub enum WorkflowError {
    /// Network, HTTP or credential failure talking to an external service
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        status_code: Option<u16>,
    },

    /// An external call exceeded its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// LLM output did not match the requested layout
    #[error("Failed to parse LLM response: {message}")]
    Parse { message: String, raw: String },

    /// Locally detected semantic mismatch (never sent upstream)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Caption renderer failure
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    /// A stage used up its retry budget
    #[error("{stage} stage gave up after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        stage: Stage,
        attempts: u32,
        last_error: String,
    },

    /// Attempted to move the workflow state backwards or out of a terminal state
    #[error("Invalid stage transition {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },
}

/// Failure classes reported by the caption renderer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("invalid box count: {0}")]
    InvalidBoxCount(String),

    /// Credentials were rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Timeout, rate limit, or server-side failure; worth retrying
    #[error("transient failure: {message}")]
    Transient {
        message: String,
        status_code: Option<u16>,
    },

    #[error("{0}")]
    Unknown(String),
}

/// Flat error classification used in [`ErrorRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Provider,
    Parse,
    Validation,
    InvalidTemplate,
    InvalidBoxCount,
    Auth,
    Transient,
    Unknown,
    ExhaustedRetries,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Config => "config",
            ErrorKind::Provider => "provider",
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
            ErrorKind::InvalidTemplate => "invalid_template",
            ErrorKind::InvalidBoxCount => "invalid_box_count",
            ErrorKind::Auth => "auth",
            ErrorKind::Transient => "transient",
            ErrorKind::Unknown => "unknown",
            ErrorKind::ExhaustedRetries => "exhausted_retries",
        };
        f.write_str(s)
    }
}

impl WorkflowError {
    /// Map this error onto the caller-facing classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Provider { .. } | WorkflowError::Timeout { .. } => ErrorKind::Provider,
            WorkflowError::Parse { .. } => ErrorKind::Parse,
            WorkflowError::Validation(_) | WorkflowError::InvalidTransition { .. } => {
                ErrorKind::Validation
            }
            WorkflowError::Render(e) => e.kind(),
            WorkflowError::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
        }
    }
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::InvalidTemplate(_) => ErrorKind::InvalidTemplate,
            RenderError::InvalidBoxCount(_) => ErrorKind::InvalidBoxCount,
            RenderError::Auth(_) => ErrorKind::Auth,
            RenderError::Transient { .. } => ErrorKind::Transient,
            RenderError::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// Structured description of a terminal workflow failure.
///
/// `retryable` tells the caller whether running again (possibly with a
/// reworded idea) may succeed, as opposed to a configuration problem such as
/// rejected credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ErrorRecord {
    /// Build a record for a workflow error raised in `stage`.
    pub fn from_workflow(stage: Stage, error: &WorkflowError) -> Self {
        let retryable = match error {
            // Retries were already spent or the input was rejected locally;
            // a fresh run (or a reworded idea) may still work.
            WorkflowError::ExhaustedRetries { .. } | WorkflowError::Validation(_) => true,
            other => crate::retry::is_retryable(other),
        };
        Self {
            stage,
            kind: error.kind(),
            message: error.to_string(),
            retryable,
        }
    }

    /// Build a record for a configuration problem detected before the run.
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Init,
            kind: ErrorKind::Config,
            message: message.into(),
            retryable: false,
        }
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} / {}] {}", self.stage, self.kind, self.message)
    }
}

impl std::error::Error for ErrorRecord {}

/// Convenience type alias for memeforge results.
pub type Result<T> = std::result::Result<T, MemeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_kinds() {
        assert_eq!(
            WorkflowError::from(RenderError::Auth("bad password".into())).kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            RenderError::Transient {
                message: "503".into(),
                status_code: Some(503)
            }
            .kind(),
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_auth_record_is_not_retryable() {
        let err = WorkflowError::Render(RenderError::Auth("Invalid username/password".into()));
        let record = ErrorRecord::from_workflow(Stage::Selected, &err);
        assert_eq!(record.kind, ErrorKind::Auth);
        assert!(!record.retryable);
        assert!(record.message.contains("Invalid username/password"));
    }

    #[test]
    fn test_exhausted_record_is_retryable() {
        let err = WorkflowError::ExhaustedRetries {
            stage: Stage::Selected,
            attempts: 4,
            last_error: "HTTP 503".into(),
        };
        let record = ErrorRecord::from_workflow(Stage::Selected, &err);
        assert_eq!(record.kind, ErrorKind::ExhaustedRetries);
        assert!(record.retryable);
    }

    #[test]
    fn test_config_record() {
        let record = ErrorRecord::config("IMGFLIP_USERNAME not set");
        assert_eq!(record.stage, Stage::Init);
        assert_eq!(record.kind, ErrorKind::Config);
        assert!(!record.retryable);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidBoxCount).unwrap();
        assert_eq!(json, "\"invalid_box_count\"");
    }
}
