//! Credential setup: LLM provider and API key, plus Imgflip login.
//!
//! Keys entered here can be used for the session only or saved into the
//! config file. Saving goes through `toml_edit` so comments survive.

use crate::cli::types::LlmProvider;
use console::Style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password, Select};
use memeforge_core::config::ProviderKind;
use memeforge_core::llm::resolve_env_var;
use memeforge_core::Config;
use std::path::Path;

use super::theme::memeforge_theme;

/// Result of the LLM provider selection flow.
pub struct LlmSelection {
    pub provider: LlmProvider,
    pub model: String,
    /// API key entered during this session (not from env/config).
    pub api_key: Option<String>,
}

/// How the renderer login will be supplied.
pub enum RendererLogin {
    /// Already available from the environment or config file.
    Configured,
    /// Entered for this session.
    Session { username: String, password: String },
}

const PROVIDERS: [LlmProvider; 4] = [
    LlmProvider::Openai,
    LlmProvider::Anthropic,
    LlmProvider::Ollama,
    LlmProvider::Hyperbolic,
];

/// Guide the user through choosing an LLM provider, API key, and model.
///
/// Returns `None` if the user cancels.
pub fn select_llm_provider(
    config: &Config,
    config_path: &Path,
) -> anyhow::Result<Option<LlmSelection>> {
    let theme = memeforge_theme();
    let dim = Style::new().for_stderr().dim();
    let warn = Style::new().for_stderr().yellow();

    let labels: Vec<&str> = PROVIDERS.iter().map(provider_label).collect();
    let configured = LlmProvider::from(config.workflow.llm_provider);
    let default = PROVIDERS.iter().position(|p| *p == configured).unwrap_or(0);

    let Some(index) = Select::with_theme(&theme)
        .with_prompt("LLM provider for captions")
        .items(&labels)
        .default(default)
        .interact_opt()?
    else {
        return Ok(None);
    };
    let provider = PROVIDERS[index];

    let mut session_api_key = None;
    if let Some(env_var) = env_var_for(&provider) {
        let has_key = std::env::var(env_var).is_ok_and(|v| !v.is_empty())
            || config_has_key(config, &provider);

        if has_key {
            eprintln!(
                "  {}",
                dim.apply_to(format!("Using existing API key from {env_var} / config"))
            );
        } else {
            eprintln!("  {}", warn.apply_to(format!("{env_var} not set.")));

            let key = match Password::with_theme(&theme)
                .with_prompt(format!(
                    "Enter your {} API key (empty to cancel)",
                    provider_label(&provider)
                ))
                .allow_empty_password(true)
                .interact()
            {
                Ok(k) if !k.trim().is_empty() => k.trim().to_string(),
                _ => return Ok(None),
            };

            if !offer_to_save(&theme, "Save this key for future sessions?", || {
                save_key_to_config(config_path, &provider, &key)
            })? {
                return Ok(None);
            }
            session_api_key = Some(key);
        }
    }

    let Some(model) = select_model(&provider, &theme)? else {
        return Ok(None);
    };

    Ok(Some(LlmSelection {
        provider,
        model,
        api_key: session_api_key,
    }))
}

/// Make sure Imgflip credentials are available, prompting if they are not.
///
/// Returns `None` if the user cancels.
pub fn ensure_renderer_login(
    config: &Config,
    config_path: &Path,
) -> anyhow::Result<Option<RendererLogin>> {
    if renderer_has_credentials(config) {
        return Ok(Some(RendererLogin::Configured));
    }

    let theme = memeforge_theme();
    let warn = Style::new().for_stderr().yellow();
    eprintln!(
        "  {}",
        warn.apply_to("Imgflip login not found (IMGFLIP_USERNAME / IMGFLIP_PASSWORD).")
    );

    let Some(username) = super::handle_interrupt(
        Input::<String>::with_theme(&theme)
            .with_prompt("Imgflip username")
            .interact_text(),
    )?
    else {
        return Ok(None);
    };
    let username = username.trim().to_string();
    if username.is_empty() {
        return Ok(None);
    }

    let password = match Password::with_theme(&theme)
        .with_prompt("Imgflip password")
        .allow_empty_password(true)
        .interact()
    {
        Ok(p) if !p.is_empty() => p,
        _ => return Ok(None),
    };

    if !offer_to_save(&theme, "Save this login for future sessions?", || {
        save_renderer_login(config_path, &username, &password)
    })? {
        return Ok(None);
    }

    Ok(Some(RendererLogin::Session { username, password }))
}

/// Ask whether to persist a secret; run `save` on yes.
///
/// Returns `false` if the user cancels. A failed save falls back to
/// session-only use.
fn offer_to_save(
    theme: &ColorfulTheme,
    prompt: &str,
    save: impl FnOnce() -> anyhow::Result<()>,
) -> anyhow::Result<bool> {
    let options = &["Yes, save to config file", "No, use for this session only"];
    let choice = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(options)
        .default(0)
        .interact_opt()?;

    match choice {
        Some(0) => {
            if let Err(e) = save() {
                let warn = Style::new().for_stderr().yellow();
                eprintln!("  {}", warn.apply_to(format!("Could not save to config: {e}")));
                eprintln!("  Using it for this session only.");
            }
            Ok(true)
        }
        Some(1) => Ok(true),
        _ => Ok(false),
    }
}

/// Prompt for a model name based on provider.
fn select_model(provider: &LlmProvider, theme: &ColorfulTheme) -> anyhow::Result<Option<String>> {
    let choices: &[(&str, &str)] = match provider {
        LlmProvider::Openai => &[
            ("gpt-4o-mini", "gpt-4o-mini (recommended)"),
            ("gpt-4o", "gpt-4o (funnier, slower)"),
        ],
        LlmProvider::Anthropic => &[
            ("claude-3-5-sonnet-20241022", "claude-3-5-sonnet (recommended)"),
            ("claude-3-5-haiku-20241022", "claude-3-5-haiku (faster, cheaper)"),
        ],
        LlmProvider::Ollama => return prompt_model_name(theme, "Ollama model name", "llama3.1"),
        LlmProvider::Hyperbolic => {
            return prompt_model_name(
                theme,
                "Hyperbolic model name",
                "meta-llama/Meta-Llama-3.1-70B-Instruct",
            )
        }
    };

    let mut labels: Vec<&str> = choices.iter().map(|(_, label)| *label).collect();
    labels.push("Custom model name...");

    let choice = Select::with_theme(theme)
        .with_prompt(format!("{} model", provider_label(provider)))
        .items(&labels)
        .default(0)
        .interact_opt()?;

    match choice {
        Some(i) if i < choices.len() => Ok(Some(choices[i].0.to_string())),
        Some(_) => prompt_model_name(theme, "Model name", ""),
        None => Ok(None),
    }
}

fn prompt_model_name(
    theme: &ColorfulTheme,
    prompt: &str,
    default: &str,
) -> anyhow::Result<Option<String>> {
    let mut input = Input::<String>::with_theme(theme).with_prompt(prompt);
    if !default.is_empty() {
        input = input.default(default.to_string());
    }
    let model = super::handle_interrupt(input.interact_text())?;
    Ok(model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty()))
}

/// Environment variable holding a provider's API key, if it needs one.
pub(crate) fn env_var_for(provider: &LlmProvider) -> Option<&'static str> {
    ProviderKind::from(*provider).api_key_env()
}

/// Human-readable label for a provider.
pub(crate) fn provider_label(provider: &LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Anthropic => "Anthropic",
        LlmProvider::Openai => "OpenAI",
        LlmProvider::Hyperbolic => "Hyperbolic",
        LlmProvider::Ollama => "Ollama (local)",
    }
}

/// A literal key, or a `${VAR}` reference whose variable is set.
fn usable_secret(value: &str) -> bool {
    resolve_env_var(value).is_some()
}

/// Check if the config already supplies an API key for the provider.
pub(crate) fn config_has_key(config: &Config, provider: &LlmProvider) -> bool {
    match provider {
        LlmProvider::Anthropic => config
            .llm
            .anthropic
            .as_ref()
            .is_some_and(|c| usable_secret(&c.api_key)),
        LlmProvider::Openai => config
            .llm
            .openai
            .as_ref()
            .is_some_and(|c| usable_secret(&c.api_key)),
        LlmProvider::Hyperbolic => config
            .llm
            .hyperbolic
            .as_ref()
            .is_some_and(|c| usable_secret(&c.api_key)),
        LlmProvider::Ollama => true,
    }
}

/// Check that both renderer credentials resolve.
pub(crate) fn renderer_has_credentials(config: &Config) -> bool {
    usable_secret(&config.renderer.username) && usable_secret(&config.renderer.password)
}

/// Save an API key under `[llm.<provider>]`.
fn save_key_to_config(config_path: &Path, provider: &LlmProvider, key: &str) -> anyhow::Result<()> {
    let section = match provider {
        LlmProvider::Anthropic => "anthropic",
        LlmProvider::Openai => "openai",
        LlmProvider::Hyperbolic => "hyperbolic",
        LlmProvider::Ollama => return Ok(()),
    };
    write_config_values(config_path, &["llm", section], &[("api_key", key)])
}

/// Save the Imgflip login under `[renderer]`.
fn save_renderer_login(config_path: &Path, username: &str, password: &str) -> anyhow::Result<()> {
    write_config_values(
        config_path,
        &["renderer"],
        &[("username", username), ("password", password)],
    )
}

/// Set string `values` in the table at `table_path`, creating tables as
/// needed and leaving the rest of the document untouched.
pub(crate) fn write_config_values(
    config_path: &Path,
    table_path: &[&str],
    values: &[(&str, &str)],
) -> anyhow::Result<()> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };
    let mut doc: toml_edit::DocumentMut = content.parse()?;

    let mut table = doc.as_table_mut();
    for name in table_path {
        if !table.contains_key(name) {
            let mut child = toml_edit::Table::new();
            child.set_implicit(table_path.len() > 1 && *name == table_path[0]);
            table.insert(name, toml_edit::Item::Table(child));
        }
        table = table
            .get_mut(name)
            .and_then(|item| item.as_table_mut())
            .ok_or_else(|| anyhow::anyhow!("[{name}] in config file is not a table"))?;
    }
    for (key, value) in values {
        table.insert(key, toml_edit::value(*value));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;

    let dim = Style::new().for_stderr().dim();
    eprintln!(
        "  {}",
        dim.apply_to(format!("Saved to {}", config_path.display()))
    );
    Ok(())
}
