//! MemeForge CLI - Turn a one-line idea into a captioned meme.
//!
//! MemeForge asks an LLM to pick a meme template, writes several caption
//! candidates, lets the model judge the funniest, and renders it through the
//! Imgflip caption API. The run report goes to stdout as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Generate a meme
//! memeforge generate "When the tests pass on the first try"
//!
//! # Browse two-box templates
//! memeforge templates --boxes 2
//!
//! # View configuration
//! memeforge config show
//!
//! # Guided mode
//! memeforge
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use memeforge_core::Config;
use std::io::IsTerminal;
use std::path::PathBuf;

mod cli;
mod logging;

/// MemeForge - Turn a one-line idea into a captioned meme.
#[derive(Parser, Debug)]
#[command(name = "memeforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "MEMEFORGE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a meme from an idea
    Generate(cli::generate::GenerateArgs),

    /// List templates from the catalog
    Templates(cli::templates::TemplatesArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

/// Load the config from an explicit path (must succeed) or the default path
/// (falls back to defaults with a warning).
fn load_config(explicit: Option<&str>) -> anyhow::Result<(Config, PathBuf)> {
    // Logging isn't initialized yet, so config warnings use eprintln.
    match explicit {
        Some(raw) => {
            let path = Config::expand_path(raw);
            if !path.exists() {
                // `config init --config <path>` creates it
                return Ok((Config::default(), path));
            }
            let config = Config::load_from(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config from {}: {e}", path.display())
            })?;
            Ok((config, path))
        }
        None => {
            let path = Config::default_path();
            let config = match Config::load() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to load config: {e}\n  \
                         Using default configuration. Check your config file with `memeforge config path`."
                    );
                    Config::default()
                }
            };
            Ok((config, path))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = load_config(cli.config.as_deref())?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("MemeForge v{}", memeforge_core::VERSION);

    match cli.command {
        Some(Commands::Generate(args)) => cli::generate::execute(args, config).await,
        Some(Commands::Templates(args)) => cli::templates::execute(args, &config).await,
        Some(Commands::Config(args)) => cli::config::execute(args, &config, &config_path).await,
        None if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() => {
            cli::interactive::run(&config, &config_path).await
        }
        None => {
            Cli::command().print_help()?;
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_parses_overrides() {
        let cli = Cli::try_parse_from([
            "memeforge",
            "generate",
            "When the build is green",
            "--llm",
            "anthropic",
            "--fallback",
            "ollama",
            "-n",
            "3",
            "--format",
            "jsonl",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Generate(args)) => {
                assert_eq!(args.idea, "When the build is green");
                assert_eq!(args.llm, Some(cli::types::LlmProvider::Anthropic));
                assert_eq!(args.fallbacks, vec![cli::types::LlmProvider::Ollama]);
                assert_eq!(args.candidates, Some(3));
                assert_eq!(args.format, Some(cli::types::OutputFormat::Jsonl));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn missing_explicit_config_uses_defaults_at_that_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let (config, resolved) = load_config(path.to_str()).unwrap();
        assert_eq!(resolved, path);
        assert_eq!(config.workflow.num_candidates, 2);
    }

    #[test]
    fn broken_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[workflow]\nnum_candidates = 0\n").unwrap();
        assert!(load_config(path.to_str()).is_err());
    }
}
