//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// LLM backends the workflow can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    Openai,
    Ollama,
    Hyperbolic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Anthropic,
        ProviderKind::Openai,
        ProviderKind::Ollama,
        ProviderKind::Hyperbolic,
    ];

    /// Environment variable conventionally holding this provider's API key.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Openai => Some("OPENAI_API_KEY"),
            ProviderKind::Hyperbolic => Some("HYPERBOLIC_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Openai => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::Hyperbolic => write!(f, "hyperbolic"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "gpt" => Ok(ProviderKind::Openai),
            "ollama" => Ok(ProviderKind::Ollama),
            "hyperbolic" => Ok(ProviderKind::Hyperbolic),
            other => Err(format!("Unknown LLM provider: {other}")),
        }
    }
}

/// Workflow settings: provider choice, candidate count, repair budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Primary LLM provider
    pub llm_provider: ProviderKind,

    /// Providers tried, in order, when the primary fails at the network/auth level
    pub fallback_providers: Vec<ProviderKind>,

    /// Model override for the primary provider (otherwise the `[llm.*]` default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,

    /// Caption candidates requested per run
    pub num_candidates: usize,

    /// Corrective re-prompts when the model names an unknown template
    pub template_retries: u32,

    /// Corrective re-prompts per caption slot (wrong box count, bad JSON)
    pub caption_retries: u32,

    /// Retries for transient catalog/render failures
    pub max_retries_per_stage: u32,

    /// Base backoff delay in milliseconds (doubles per retry)
    pub retry_delay_ms: u64,

    /// Template used when the model never names a valid one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_template_id: Option<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            llm_provider: ProviderKind::Openai,
            fallback_providers: Vec::new(),
            llm_model: None,
            num_candidates: 2,
            template_retries: 2,
            caption_retries: 1,
            max_retries_per_stage: 3,
            retry_delay_ms: 1000,
            default_template_id: None,
        }
    }
}

/// Timeouts for every external call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// LLM call timeout in milliseconds
    pub llm_timeout_ms: u64,

    /// Template catalog fetch timeout in milliseconds
    pub catalog_timeout_ms: u64,

    /// Caption render timeout in milliseconds
    pub render_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            llm_timeout_ms: 60_000,
            catalog_timeout_ms: 10_000,
            render_timeout_ms: 30_000,
        }
    }
}

/// Template catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Endpoint returning the template list
    pub endpoint: String,

    /// Keep the first successful fetch for the rest of the process
    pub cache: bool,

    /// Maximum templates listed in the selection prompt
    pub max_prompt_templates: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.imgflip.com/get_memes".to_string(),
            cache: true,
            max_prompt_templates: 100,
        }
    }
}

/// Caption renderer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Compositing endpoint
    pub endpoint: String,

    /// Account username (supports ${ENV_VAR} syntax)
    pub username: String,

    /// Account password (supports ${ENV_VAR} syntax)
    pub password: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.imgflip.com/caption_image".to_string(),
            username: "${IMGFLIP_USERNAME}".to_string(),
            password: "${IMGFLIP_PASSWORD}".to_string(),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,

    /// Include the stage trace in printed results
    pub include_trace: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: true,
            include_trace: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM provider configurations and shared sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Sampling temperature for every call
    pub temperature: f32,

    /// Maximum tokens per completion
    pub max_tokens: u32,

    /// Ollama (local) configuration
    pub ollama: Option<OllamaConfig>,

    /// Hyperbolic (hosted, OpenAI-compatible) configuration
    pub hyperbolic: Option<HyperbolicConfig>,

    /// Anthropic configuration
    pub anthropic: Option<AnthropicConfig>,

    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 400,
            ollama: None,
            hyperbolic: None,
            anthropic: None,
            openai: None,
        }
    }
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
        }
    }
}

/// Hyperbolic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperbolicConfig {
    /// API endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for HyperbolicConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.hyperbolic.xyz/v1".to_string(),
            api_key: "${HYPERBOLIC_API_KEY}".to_string(),
            model: "meta-llama/Meta-Llama-3.1-70B-Instruct".to_string(),
        }
    }
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str_aliases() {
        assert_eq!("Claude".parse::<ProviderKind>(), Ok(ProviderKind::Anthropic));
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::Openai));
        assert_eq!(" ollama ".parse::<ProviderKind>(), Ok(ProviderKind::Ollama));
        assert!("bard".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_display_round_trips() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.to_string().parse::<ProviderKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_api_key_env() {
        assert_eq!(ProviderKind::Anthropic.api_key_env(), Some("ANTHROPIC_API_KEY"));
        assert_eq!(ProviderKind::Ollama.api_key_env(), None);
    }
}
