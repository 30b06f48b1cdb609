//! Configuration management for memeforge.
//!
//! Configuration is loaded from the platform config directory
//! (`~/.config/memeforge/config.toml` on Linux) with sensible defaults.
//! Every section implements `Default`, so a missing file or a partial file
//! both work.

mod types;
mod validate;

pub use types::*;
pub use validate::MAX_CANDIDATES;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for memeforge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workflow settings (provider, candidates, retry budgets)
    pub workflow: WorkflowConfig,

    /// Timeouts for external calls
    pub limits: LimitsConfig,

    /// Template catalog settings
    pub catalog: CatalogConfig,

    /// Caption renderer settings
    pub renderer: RendererConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// LLM provider settings
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.memeforge.memeforge/config.toml
    /// - Linux: ~/.config/memeforge/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\memeforge\config\config.toml
    ///
    /// Falls back to ~/.memeforge/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "memeforge", "memeforge")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".memeforge").join("config.toml")
            })
    }

    /// Expand `~` and `$VAR` in a user-supplied config path.
    pub fn expand_path(raw: &str) -> PathBuf {
        match shellexpand::full(raw) {
            Ok(expanded) => PathBuf::from(expanded.into_owned()),
            Err(_) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Check the config and report every problem as a [`ConfigError`].
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.workflow.num_candidates, 2);
        assert_eq!(config.workflow.template_retries, 2);
        assert_eq!(config.workflow.caption_retries, 1);
        assert_eq!(config.workflow.llm_provider, ProviderKind::Openai);
        assert!(config.catalog.cache);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[workflow]"));
        assert!(toml.contains("[renderer]"));
        assert!(toml.contains("llm_provider = \"openai\""));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[workflow]\nllm_provider = \"anthropic\"\nnum_candidates = 3\n\n[llm.anthropic]\napi_key = \"sk-test\"\nmodel = \"claude-test\""
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.workflow.llm_provider, ProviderKind::Anthropic);
        assert_eq!(config.workflow.num_candidates, 3);
        assert_eq!(config.workflow.caption_retries, 1);
        assert_eq!(config.limits.llm_timeout_ms, 60_000);
        assert_eq!(config.llm.anthropic.unwrap().api_key, "sk-test");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[workflow]\nnum_candidates = 0").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("num_candidates"));
    }

    #[test]
    fn test_load_rejects_unknown_provider() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[workflow]\nllm_provider = \"bard\"").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.catalog.endpoint, config.catalog.endpoint);
        assert_eq!(parsed.renderer.username, "${IMGFLIP_USERNAME}");
    }

    #[test]
    fn test_expand_path_plain_passthrough() {
        let expanded = Config::expand_path("/etc/memeforge/config.toml");
        assert_eq!(expanded, PathBuf::from("/etc/memeforge/config.toml"));
    }
}
