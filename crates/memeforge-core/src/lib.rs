//! MemeForge Core - LLM-driven meme generation workflow.
//!
//! MemeForge turns a one-line meme idea into a rendered meme image by
//! orchestrating three external services: a template catalog, one or more
//! LLM providers, and a caption-compositing API.
//!
//! # Architecture
//!
//! ```text
//! Idea → Select template → Generate N captions → Pick funniest → Render → URL
//! ```
//!
//! Every LLM answer is schema-checked and repaired with corrective prompts
//! where possible; see [`workflow`] for the stage rules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use memeforge_core::{Config, MemeForge};
//!
//! #[tokio::main]
//! async fn main() -> memeforge_core::Result<()> {
//!     let forge = MemeForge::with_defaults()?;
//!
//!     match forge.generate("When you fix a bug but create three new ones").await {
//!         Ok(meme) => println!("{}", meme.final_image_ref),
//!         Err(record) => eprintln!("{} failed: {}", record.stage, record.message),
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod output;
pub mod render;
pub mod retry;
pub mod types;
pub mod workflow;

pub use catalog::{ImgflipCatalog, TemplateCatalog, TemplateSource};
pub use config::Config;
pub use error::{ConfigError, ErrorKind, ErrorRecord, MemeError, RenderError, Result, WorkflowError};
pub use llm::{LlmClient, LlmProvider, StructuredPrompt};
pub use output::{OutputFormat, OutputWriter, RunReport};
pub use render::{CaptionRenderer, ImgflipRenderer};
pub use retry::RetryPolicy;
pub use types::{
    CaptionCandidate, MemeOutcome, SelectionResult, Stage, StageOutcome, StageRecord, Template,
};
pub use workflow::{run_workflow, Orchestrator, WorkflowOptions, WorkflowState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main entry point: a configured orchestrator.
pub struct MemeForge {
    config: Config,
    orchestrator: Orchestrator,
}

impl MemeForge {
    /// Create a MemeForge instance from `config`.
    ///
    /// Fails if the config is invalid, renderer credentials are missing, or
    /// the primary LLM provider cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing MemeForge v{}", VERSION);
        config.check()?;
        let orchestrator = Orchestrator::from_config(&config)?;
        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// Create a MemeForge instance from the default config file.
    pub fn with_defaults() -> Result<Self> {
        Self::new(Config::load()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Generate one meme.
    pub async fn generate(&self, idea: &str) -> std::result::Result<MemeOutcome, ErrorRecord> {
        self.orchestrator.run(idea).await
    }

    /// Generate one meme and keep the full terminal state (trace included on failure).
    pub async fn generate_state(&self, idea: &str) -> WorkflowState {
        self.orchestrator.run_state(idea).await
    }
}
