//! Workflow orchestration.
//!
//! A run moves through a fixed sequence of stages:
//!
//! ```text
//! INIT → TEMPLATE_SELECTED → CANDIDATES_GENERATED → SELECTED → RENDERED
//!   └──────────────┴────────────────┴──────────────┴──→ FAILED
//! ```
//!
//! Every model answer is parsed and validated before use. The template stage
//! always ends on a catalog template (falling back to a deterministic
//! default), caption slots that cannot be repaired are dropped, and an
//! unusable evaluation defaults to the first candidate. Only a run with zero
//! caption candidates or a render failure ends in `FAILED`.

mod captions;
mod evaluate;
pub mod prompts;
mod render;
mod repair;
pub mod schema;
mod state;
mod template;

#[cfg(test)]
mod tests;

pub use evaluate::resolve_index;
pub use state::{Rejected, Transition, WorkflowState};
pub use template::fallback_template;

use crate::catalog::TemplateCatalog;
use crate::config::Config;
use crate::error::{ErrorRecord, Result, WorkflowError};
use crate::llm::LlmClient;
use crate::render::{CaptionRenderer, ImgflipRenderer};
use crate::retry::RetryPolicy;
use crate::types::{MemeOutcome, Stage};
use std::time::Duration;

/// Per-run knobs, usually taken from `[workflow]`.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub num_candidates: usize,
    pub template_retries: u32,
    pub caption_retries: u32,
    /// Backoff for transient render failures
    pub render_retry: RetryPolicy,
    pub default_template_id: Option<String>,
    /// Templates listed in the selection prompt
    pub max_prompt_templates: usize,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl WorkflowOptions {
    pub fn from_config(config: &Config) -> Self {
        let workflow = &config.workflow;
        Self {
            num_candidates: workflow.num_candidates,
            template_retries: workflow.template_retries,
            caption_retries: workflow.caption_retries,
            render_retry: RetryPolicy::new(workflow.max_retries_per_stage, workflow.retry_delay_ms),
            default_template_id: workflow.default_template_id.clone(),
            max_prompt_templates: config.catalog.max_prompt_templates,
        }
    }
}

/// Runs memes end to end against a catalog, an LLM client and a renderer.
pub struct Orchestrator {
    catalog: TemplateCatalog,
    llm: LlmClient,
    renderer: Box<dyn CaptionRenderer>,
    options: WorkflowOptions,
}

impl Orchestrator {
    pub fn new(
        catalog: TemplateCatalog,
        llm: LlmClient,
        renderer: Box<dyn CaptionRenderer>,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            catalog,
            llm,
            renderer,
            options,
        }
    }

    /// Wire up the Imgflip catalog and renderer and the configured LLM chain.
    ///
    /// Fails on missing renderer credentials or an unusable primary provider.
    pub fn from_config(config: &Config) -> Result<Self> {
        let renderer = ImgflipRenderer::from_config(
            &config.renderer,
            Duration::from_millis(config.limits.render_timeout_ms),
        )?;
        let llm = LlmClient::from_config(config)?;
        tracing::debug!("LLM provider chain: {:?}", llm.provider_names());

        Ok(Self::new(
            TemplateCatalog::from_config(config),
            llm,
            Box::new(renderer),
            WorkflowOptions::from_config(config),
        ))
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    /// Run every stage and return the terminal state (RENDERED or FAILED).
    pub async fn run_state(&self, user_idea: &str) -> WorkflowState {
        let state = WorkflowState::new(user_idea);
        let idea = state.user_idea().to_string();
        if idea.is_empty() {
            let error = WorkflowError::Validation("meme idea is empty".to_string());
            return state.fail(Stage::Init, &error, 0);
        }
        tracing::info!("Starting meme workflow for idea: {idea}");

        // INIT -> TEMPLATE_SELECTED
        let templates = match self.catalog.list_templates().await {
            Ok(templates) => templates,
            Err(e) => return state.fail(Stage::TemplateSelected, &e, 1),
        };
        let Some(pick) =
            template::select_template(&self.llm, &idea, &templates, &self.options).await
        else {
            let error = WorkflowError::Validation("template catalog is empty".to_string());
            return state.fail(Stage::TemplateSelected, &error, 0);
        };
        let template = pick.template.clone();
        let state = match state.template_selected(
            pick.template,
            pick.rationale,
            pick.fallback,
            pick.attempts,
        ) {
            Ok(state) => state,
            Err(rejected) => return rejected.into_failed(),
        };

        // TEMPLATE_SELECTED -> CANDIDATES_GENERATED
        let batch = captions::generate_candidates(
            &self.llm,
            &idea,
            &template,
            self.options.num_candidates,
            self.options.caption_retries,
        )
        .await;
        if batch.candidates.is_empty() {
            let error = WorkflowError::ExhaustedRetries {
                stage: Stage::CandidatesGenerated,
                attempts: batch.attempts,
                last_error: batch
                    .last_error
                    .unwrap_or_else(|| "no caption candidates requested".to_string()),
            };
            return state.fail(Stage::CandidatesGenerated, &error, batch.attempts);
        }
        let state = match state.candidates_generated(batch.candidates, batch.dropped, batch.attempts)
        {
            Ok(state) => state,
            Err(rejected) => return rejected.into_failed(),
        };

        // CANDIDATES_GENERATED -> SELECTED
        let choice =
            evaluate::choose_candidate(&self.llm, &idea, &template, state.candidates()).await;
        let state = match state.selected(
            choice.selection,
            choice.evaluated,
            choice.defaulted,
            choice.attempts,
        ) {
            Ok(state) => state,
            Err(rejected) => return rejected.into_failed(),
        };

        // SELECTED -> RENDERED
        let box_texts = state
            .chosen()
            .map(|c| c.box_texts.clone())
            .unwrap_or_default();
        match render::render_with_retry(
            self.renderer.as_ref(),
            &template,
            &box_texts,
            &self.options.render_retry,
        )
        .await
        {
            Ok(rendering) => match state.rendered(rendering.image_ref, rendering.attempts) {
                Ok(state) => state,
                Err(rejected) => rejected.into_failed(),
            },
            Err(failure) => state.fail(Stage::Rendered, &failure.error, failure.attempts),
        }
    }

    /// Run the workflow and return the caller-facing result.
    pub async fn run(&self, user_idea: &str) -> std::result::Result<MemeOutcome, ErrorRecord> {
        self.run_state(user_idea).await.into_outcome()
    }
}

/// Build an orchestrator from `config` and run one meme.
///
/// Configuration problems (missing credentials, no usable LLM provider) come
/// back as an [`ErrorRecord`] of kind `config`.
pub async fn run_workflow(
    user_idea: &str,
    config: &Config,
) -> std::result::Result<MemeOutcome, ErrorRecord> {
    config
        .check()
        .map_err(|e| ErrorRecord::config(e.to_string()))?;
    let orchestrator =
        Orchestrator::from_config(config).map_err(|e| ErrorRecord::config(e.to_string()))?;
    orchestrator.run(user_idea).await
}
