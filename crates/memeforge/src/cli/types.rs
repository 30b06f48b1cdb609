//! CLI enum types shared by commands: output format and LLM provider.

use clap::ValueEnum;
use memeforge_core::config::ProviderKind;
use memeforge_core::OutputFormat as CoreOutputFormat;

/// Supported output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON document
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Supported LLM providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    /// Anthropic API
    Anthropic,
    /// OpenAI API
    Openai,
    /// Local Ollama instance
    Ollama,
    /// Hyperbolic API
    Hyperbolic,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        ProviderKind::from(*self).fmt(f)
    }
}

impl From<LlmProvider> for ProviderKind {
    fn from(provider: LlmProvider) -> Self {
        match provider {
            LlmProvider::Anthropic => ProviderKind::Anthropic,
            LlmProvider::Openai => ProviderKind::Openai,
            LlmProvider::Ollama => ProviderKind::Ollama,
            LlmProvider::Hyperbolic => ProviderKind::Hyperbolic,
        }
    }
}

impl From<ProviderKind> for LlmProvider {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Anthropic => LlmProvider::Anthropic,
            ProviderKind::Openai => LlmProvider::Openai,
            ProviderKind::Ollama => LlmProvider::Ollama,
            ProviderKind::Hyperbolic => LlmProvider::Hyperbolic,
        }
    }
}
