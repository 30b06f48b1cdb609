//! The `memeforge generate` command.

use super::download::{download_file, resolve_destination};
use super::types::{LlmProvider, OutputFormat};
use clap::Args;
use memeforge_core::config::{LlmConfig, ProviderKind};
use memeforge_core::{
    Config, MemeError, MemeForge, OutputFormat as CoreOutputFormat, OutputWriter, RunReport,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the `generate` command.
#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// The meme idea, e.g. "When you fix a bug but create three new ones"
    #[arg(required = true)]
    pub idea: String,

    /// Primary LLM provider (overrides [workflow].llm_provider)
    #[arg(long, value_enum)]
    pub llm: Option<LlmProvider>,

    /// LLM model name for the primary provider
    #[arg(long)]
    pub llm_model: Option<String>,

    /// Fallback provider, tried in order when the primary fails (repeatable)
    #[arg(long = "fallback", value_enum)]
    pub fallbacks: Vec<LlmProvider>,

    /// Number of caption candidates to generate
    #[arg(short = 'n', long)]
    pub candidates: Option<usize>,

    /// Retries for transient render and catalog failures
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to [output].format)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Download the rendered image to this file or directory
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// API key for the selected LLM provider (session-only, set by interactive mode).
    #[arg(skip)]
    pub api_key: Option<String>,

    /// Renderer username/password (session-only, set by interactive mode).
    #[arg(skip)]
    pub renderer_credentials: Option<(String, String)>,
}

/// Apply command-line overrides on top of the loaded config.
pub fn apply_overrides(mut config: Config, args: &GenerateArgs) -> anyhow::Result<Config> {
    if let Some(provider) = args.llm {
        config.workflow.llm_provider = provider.into();
        // A model set in the file belongs to the configured provider
        config.workflow.llm_model = None;
    }
    if let Some(model) = &args.llm_model {
        config.workflow.llm_model = Some(model.clone());
    }
    if !args.fallbacks.is_empty() {
        config.workflow.fallback_providers =
            args.fallbacks.iter().map(|p| ProviderKind::from(*p)).collect();
    }
    let primary = config.workflow.llm_provider;
    config.workflow.fallback_providers.retain(|kind| *kind != primary);
    if let Some(n) = args.candidates {
        config.workflow.num_candidates = n;
    }
    if let Some(retries) = args.max_retries {
        config.workflow.max_retries_per_stage = retries;
    }
    if let Some(key) = &args.api_key {
        inject_api_key(&mut config.llm, config.workflow.llm_provider, key);
    }
    if let Some((username, password)) = &args.renderer_credentials {
        config.renderer.username = username.clone();
        config.renderer.password = password.clone();
    }

    config.check()?;
    Ok(config)
}

/// Inject a session API key into the LLM config for `provider`.
pub fn inject_api_key(llm_config: &mut LlmConfig, provider: ProviderKind, key: &str) {
    match provider {
        ProviderKind::Anthropic => {
            let cfg = llm_config.anthropic.get_or_insert_with(Default::default);
            cfg.api_key = key.to_string();
        }
        ProviderKind::Openai => {
            let cfg = llm_config.openai.get_or_insert_with(Default::default);
            cfg.api_key = key.to_string();
        }
        ProviderKind::Hyperbolic => {
            let cfg = llm_config.hyperbolic.get_or_insert_with(Default::default);
            cfg.api_key = key.to_string();
        }
        ProviderKind::Ollama => {} // Ollama doesn't use API keys
    }
}

/// Execute the generate command.
pub async fn execute(args: GenerateArgs, config: Config) -> anyhow::Result<()> {
    let config = apply_overrides(config, &args)?;
    let forge = MemeForge::new(config.clone()).map_err(with_hint)?;

    let spinner = create_spinner();
    let state = forge.generate_state(&args.idea).await;
    spinner.finish_and_clear();

    let report = RunReport::from_state(&state, config.output.include_trace);
    let format = args
        .format
        .map(CoreOutputFormat::from)
        .or_else(|| CoreOutputFormat::parse(&config.output.format))
        .unwrap_or(CoreOutputFormat::Json);

    if let Some(ref output_path) = args.output {
        let file = File::create(output_path)?;
        let mut writer = OutputWriter::new(BufWriter::new(file), format, config.output.pretty);
        writer.write(&report)?;
        writer.flush()?;
        tracing::info!("Output written to {:?}", output_path);
    } else {
        let stdout = std::io::stdout();
        let mut writer = OutputWriter::new(stdout.lock(), format, config.output.pretty);
        writer.write(&report)?;
        writer.flush()?;
    }

    match state.into_outcome() {
        Ok(outcome) => {
            if let Some(ref target) = args.save {
                let dest = resolve_destination(target, &outcome.final_image_ref);
                download_file(&reqwest::Client::new(), &outcome.final_image_ref, &dest).await?;
                eprintln!("Saved meme to {}", dest.display());
            }
            Ok(())
        }
        Err(record) => {
            let hint = if record.retryable {
                "Hint: this may succeed if you run it again or reword the idea."
            } else {
                "Hint: this looks like a configuration problem. Check `memeforge config show`."
            };
            anyhow::bail!(
                "{} stage failed ({}): {}\n\n  {hint}",
                record.stage,
                record.kind,
                record.message
            )
        }
    }
}

/// Attach a setup hint to construction errors.
fn with_hint(err: MemeError) -> anyhow::Error {
    match err {
        MemeError::Config(e) => anyhow::anyhow!(
            "{e}\n\n  Hint: export IMGFLIP_USERNAME / IMGFLIP_PASSWORD and your provider's API key, \
             or run `memeforge` with no arguments for guided setup."
        ),
        other => anyhow::anyhow!(
            "{other}\n\n  Hint: check the [llm] section with `memeforge config show`."
        ),
    }
}

fn create_spinner() -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Forging meme (template, captions, judging, rendering)...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
