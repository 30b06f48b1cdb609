//! Interactive CLI mode, the guided experience for bare `memeforge`.
//!
//! When `memeforge` is invoked with no subcommand on a TTY, this module
//! provides a menu-driven interface that delegates to the same command
//! handlers as the flag-based CLI.

pub mod generate;
pub mod setup;
pub mod theme;

use crate::cli::templates::{self, TemplatesArgs};
use crate::cli::types::LlmProvider;
use console::Style;
use dialoguer::{Input, Select};
use memeforge_core::config::ProviderKind;
use memeforge_core::Config;
use std::path::Path;

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)` on
/// interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O failures.
///
/// Wraps `interact_text()` / `interact()` calls that lack an `_opt` variant.
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Main menu options presented to the user.
const MENU_ITEMS: &[&str] = &[
    "Generate a meme",
    "Browse templates",
    "Configure settings",
    "Exit",
];

/// Entry point for interactive mode.
pub async fn run(config: &Config, config_path: &Path) -> anyhow::Result<()> {
    theme::print_banner();

    let theme = theme::memeforge_theme();

    loop {
        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(MENU_ITEMS)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => generate::guided_generate(config, config_path).await?,
            Some(1) => browse_templates(config).await?,
            Some(2) => show_config(config, config_path)?,
            _ => break, // Exit or Ctrl+C / Esc
        }
    }

    Ok(())
}

/// Search the catalog by name and print the matches.
async fn browse_templates(config: &Config) -> anyhow::Result<()> {
    let theme = theme::memeforge_theme();

    let Some(search) = handle_interrupt(
        Input::<String>::with_theme(&theme)
            .with_prompt("Search templates (empty for the most popular)")
            .allow_empty(true)
            .interact_text(),
    )?
    else {
        return Ok(());
    };

    let args = TemplatesArgs {
        search: Some(search),
        ..TemplatesArgs::default()
    };
    eprintln!();
    if let Err(e) = templates::execute(args, config).await {
        let err = Style::new().for_stderr().red();
        eprintln!("  {} {e:#}", err.apply_to("✗"));
    }
    eprintln!();
    Ok(())
}

/// Interactive config viewer: a summary of current settings, with the full
/// TOML or the config file path on request.
fn show_config(config: &Config, config_path: &Path) -> anyhow::Result<()> {
    let theme = theme::memeforge_theme();
    let dim = Style::new().for_stderr().dim();
    let magenta = Style::new().for_stderr().magenta();
    let label = Style::new().for_stderr().bold();

    loop {
        eprintln!();
        eprintln!("  {}", magenta.apply_to("Current configuration:"));
        eprintln!();

        let path_note = if config_path.exists() {
            "(exists)"
        } else {
            "(using defaults)"
        };
        let workflow = &config.workflow;

        eprintln!(
            "    {:<20} {} {}",
            label.apply_to("Config file:"),
            config_path.display(),
            dim.apply_to(path_note)
        );
        eprintln!(
            "    {:<20} {}",
            label.apply_to("LLM provider:"),
            provider_summary(config)
        );
        eprintln!(
            "    {:<20} {}",
            label.apply_to("Fallbacks:"),
            fallback_summary(&workflow.fallback_providers)
        );
        eprintln!(
            "    {:<20} {} (template repairs: {}, caption repairs: {})",
            label.apply_to("Candidates:"),
            workflow.num_candidates,
            workflow.template_retries,
            workflow.caption_retries
        );
        eprintln!(
            "    {:<20} {} retries, {}ms base delay",
            label.apply_to("Render retries:"),
            workflow.max_retries_per_stage,
            workflow.retry_delay_ms
        );
        eprintln!(
            "    {:<20} {}",
            label.apply_to("Imgflip login:"),
            if setup::renderer_has_credentials(config) {
                "configured"
            } else {
                "missing"
            }
        );
        eprintln!(
            "    {:<20} {}",
            label.apply_to("API keys:"),
            key_summary(config)
        );
        eprintln!(
            "    {:<20} {}",
            label.apply_to("Log level:"),
            config.logging.level
        );
        eprintln!();

        let items = &["View full config (TOML)", "Show config file path", "Back"];

        let selection = Select::with_theme(&theme)
            .with_prompt("Configuration")
            .items(items)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => match config.to_toml() {
                Ok(toml) => {
                    eprintln!();
                    eprintln!("{}", dim.apply_to("─".repeat(50)));
                    eprintln!("{toml}");
                    eprintln!("{}", dim.apply_to("─".repeat(50)));
                    eprintln!();
                }
                Err(e) => {
                    let err = Style::new().for_stderr().red();
                    eprintln!("  {} Failed to serialize config: {e}", err.apply_to("✗"));
                    eprintln!();
                }
            },
            Some(1) => {
                eprintln!();
                eprintln!("  {}", config_path.display());
                eprintln!();
            }
            _ => break, // Back or Esc / Ctrl+C
        }
    }

    Ok(())
}

/// Primary provider, with the model override when one is set.
fn provider_summary(config: &Config) -> String {
    let provider = setup::provider_label(&LlmProvider::from(config.workflow.llm_provider));
    match &config.workflow.llm_model {
        Some(model) => format!("{provider} ({model})"),
        None => provider.to_string(),
    }
}

fn fallback_summary(fallbacks: &[ProviderKind]) -> String {
    if fallbacks.is_empty() {
        "none".to_string()
    } else {
        fallbacks
            .iter()
            .map(|kind| setup::provider_label(&LlmProvider::from(*kind)))
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

/// Summarise which keyed providers have a usable API key.
fn key_summary(config: &Config) -> String {
    let ready: Vec<&str> = ProviderKind::ALL
        .iter()
        .filter(|kind| kind.api_key_env().is_some())
        .map(|kind| LlmProvider::from(*kind))
        .filter(|provider| {
            setup::config_has_key(config, provider)
                || setup::env_var_for(provider)
                    .is_some_and(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()))
        })
        .map(|provider| setup::provider_label(&provider))
        .collect();

    if ready.is_empty() {
        "none configured".to_string()
    } else {
        ready.join(", ")
    }
}
