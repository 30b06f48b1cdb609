//! End-to-end workflow tests against stub services.

use super::*;
use crate::catalog::TemplateSource;
use crate::error::{ErrorKind, RenderError};
use crate::llm::{LlmProvider, LlmRequest, LlmResponse};
use crate::types::{StageOutcome, Template};
use async_trait::async_trait;
use std::result::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

const IDEA: &str = "When you fix a bug but create three new ones";
const DRAKE_ID: &str = "181913649";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Template,
    Caption,
    Evaluation,
}

fn classify(prompt: &str) -> Call {
    if prompt.contains("## Available templates") {
        Call::Template
    } else if prompt.contains("## Candidates") {
        Call::Evaluation
    } else {
        Call::Caption
    }
}

type Reply = Box<dyn Fn(Call, &str) -> Result<String, WorkflowError> + Send + Sync>;

/// LLM stub that answers by prompt content, so concurrent caption calls
/// get stable answers regardless of scheduling.
struct StubLlm {
    reply: Reply,
    calls: Arc<Mutex<Vec<Call>>>,
    slow_first_variant: bool,
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn name(&self) -> &str {
        "stub"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, WorkflowError> {
        let call = classify(&request.prompt);
        self.calls.lock().unwrap().push(call);
        if self.slow_first_variant && request.prompt.contains("variant 1 of") {
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        (self.reply)(call, &request.prompt).map(|text| LlmResponse {
            text,
            model: "stub-model".to_string(),
            tokens_used: None,
            latency_ms: 0,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

struct StubRenderer {
    reply: Box<dyn Fn(u32, &[String]) -> Result<String, RenderError> + Send + Sync>,
    calls: Arc<AtomicU32>,
    received: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

#[async_trait]
impl CaptionRenderer for StubRenderer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn render(&self, template_id: &str, box_texts: &[String]) -> Result<String, RenderError> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        self.received
            .lock()
            .unwrap()
            .push((template_id.to_string(), box_texts.to_vec()));
        (self.reply)(idx, box_texts)
    }
}

struct StubSource {
    templates: Result<Vec<Template>, WorkflowError>,
}

#[async_trait]
impl TemplateSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch_templates(&self) -> Result<Vec<Template>, WorkflowError> {
        self.templates.clone()
    }
}

fn catalog() -> Vec<Template> {
    vec![
        Template::new("87743020", "Two Buttons", 3),
        Template::new(DRAKE_ID, "Drake Hotline Bling", 2),
        Template::new("112126428", "Distracted Boyfriend", 3),
    ]
}

fn happy_reply(call: Call, prompt: &str) -> Result<String, WorkflowError> {
    Ok(match call {
        Call::Template => format!(r#"{{"template_id": "{DRAKE_ID}", "rationale": "reject/prefer"}}"#),
        Call::Caption if prompt.contains("variant 1 of") => {
            r#"{"box_texts": ["Fixing the bug", "Shipping three new ones"], "rationale": "classic"}"#
                .to_string()
        }
        Call::Caption => {
            r#"{"box_texts": ["Writing tests first", "Fixing one bug, creating three"]}"#.to_string()
        }
        Call::Evaluation => r#"{"chosen_index": 1, "justification": "more relatable"}"#.to_string(),
    })
}

fn url_renderer() -> StubRenderer {
    StubRenderer {
        reply: Box::new(|_: u32, texts: &[String]| {
            Ok(format!("https://i.imgflip.com/{}.jpg", texts.join("_").len()))
        }),
        calls: Arc::new(AtomicU32::new(0)),
        received: Arc::new(Mutex::new(Vec::new())),
    }
}

fn options() -> WorkflowOptions {
    WorkflowOptions {
        num_candidates: 2,
        template_retries: 2,
        caption_retries: 1,
        render_retry: RetryPolicy::new(3, 1),
        default_template_id: None,
        max_prompt_templates: 100,
    }
}

struct Harness {
    orchestrator: Orchestrator,
    llm_calls: Arc<Mutex<Vec<Call>>>,
    render_calls: Arc<AtomicU32>,
    rendered: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl Harness {
    fn new(reply: Reply, renderer: StubRenderer, options: WorkflowOptions) -> Self {
        Self::build(reply, renderer, options, Ok(catalog()), false)
    }

    fn build(
        reply: Reply,
        renderer: StubRenderer,
        options: WorkflowOptions,
        templates: Result<Vec<Template>, WorkflowError>,
        slow_first_variant: bool,
    ) -> Self {
        let llm_calls = Arc::new(Mutex::new(Vec::new()));
        let llm = StubLlm {
            reply,
            calls: llm_calls.clone(),
            slow_first_variant,
        };
        let render_calls = renderer.calls.clone();
        let rendered = renderer.received.clone();
        let catalog = TemplateCatalog::new(Box::new(StubSource { templates }))
            .with_retry(RetryPolicy::new(0, 1));

        Self {
            orchestrator: Orchestrator::new(
                catalog,
                LlmClient::new(Box::new(llm)),
                Box::new(renderer),
                options,
            ),
            llm_calls,
            render_calls,
            rendered,
        }
    }

    fn count(&self, call: Call) -> usize {
        self.llm_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == call)
            .count()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_round_trip_renders_selected_candidate() {
    let h = Harness::new(Box::new(happy_reply), url_renderer(), options());

    let outcome = h.orchestrator.run(IDEA).await.unwrap();

    let rendered = h.rendered.lock().unwrap().clone();
    assert_eq!(
        rendered,
        vec![(
            DRAKE_ID.to_string(),
            vec![
                "Writing tests first".to_string(),
                "Fixing one bug, creating three".to_string()
            ]
        )]
    );
    assert_eq!(outcome.template.name, "Drake Hotline Bling");
    assert_eq!(outcome.box_texts, rendered[0].1);
    assert!(outcome.final_image_ref.starts_with("https://i.imgflip.com/"));

    let stages: Vec<Stage> = outcome.trace.iter().map(|r| r.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::TemplateSelected,
            Stage::CandidatesGenerated,
            Stage::Selected,
            Stage::Rendered
        ]
    );
    match &outcome.trace[0].outcome {
        StageOutcome::TemplateChosen {
            template_id,
            fallback,
            rationale,
            ..
        } => {
            assert_eq!(template_id, DRAKE_ID);
            assert!(fallback.is_none());
            assert_eq!(rationale.as_deref(), Some("reject/prefer"));
        }
        other => panic!("unexpected first trace entry: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_identical_stubs_give_identical_results() {
    let first = Harness::new(Box::new(happy_reply), url_renderer(), options())
        .orchestrator
        .run(IDEA)
        .await
        .unwrap();
    let second = Harness::new(Box::new(happy_reply), url_renderer(), options())
        .orchestrator
        .run(IDEA)
        .await
        .unwrap();

    assert_eq!(first.final_image_ref, second.final_image_ref);
    assert_eq!(first.trace, second.trace);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_candidates_keep_request_order() {
    let h = Harness::build(
        Box::new(happy_reply),
        url_renderer(),
        options(),
        Ok(catalog()),
        true,
    );

    let state = h.orchestrator.run_state(IDEA).await;
    assert_eq!(state.stage(), Stage::Rendered);
    assert_eq!(state.candidates()[0].box_texts[0], "Fixing the bug");
    assert_eq!(state.candidates()[1].box_texts[0], "Writing tests first");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_range_index_defaults_to_first() {
    let reply: Reply = Box::new(|call: Call, prompt: &str| match call {
        Call::Evaluation => Ok(r#"{"chosen_index": 7, "justification": "the eighth"}"#.to_string()),
        _ => happy_reply(call, prompt),
    });
    let h = Harness::new(reply, url_renderer(), options());

    let state = h.orchestrator.run_state(IDEA).await;
    assert_eq!(state.selection().unwrap().chosen_index, 0);
    assert_eq!(
        h.rendered.lock().unwrap()[0].1,
        vec!["Fixing the bug", "Shipping three new ones"]
    );
    match &state.trace()[2].outcome {
        StageOutcome::CandidateSelected {
            defaulted,
            evaluated,
            ..
        } => assert!(*defaulted && *evaluated),
        other => panic!("unexpected trace entry: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_string_index_selects_that_candidate() {
    let reply: Reply = Box::new(|call: Call, prompt: &str| match call {
        Call::Evaluation => Ok(r#"{"chosen_index": "1", "justification": "quoted"}"#.to_string()),
        _ => happy_reply(call, prompt),
    });
    let h = Harness::new(reply, url_renderer(), options());

    let state = h.orchestrator.run_state(IDEA).await;
    assert_eq!(state.selection().unwrap().chosen_index, 1);
    assert_eq!(
        h.rendered.lock().unwrap()[0].1,
        vec!["Writing tests first", "Fixing one bug, creating three"]
    );
    match &state.trace()[2].outcome {
        StageOutcome::CandidateSelected { defaulted, .. } => assert!(!*defaulted),
        other => panic!("unexpected trace entry: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unparseable_evaluation_defaults_to_first() {
    let reply: Reply = Box::new(|call: Call, prompt: &str| match call {
        Call::Evaluation => Ok("Both are hilarious!".to_string()),
        _ => happy_reply(call, prompt),
    });
    let h = Harness::new(reply, url_renderer(), options());

    let outcome = h.orchestrator.run(IDEA).await.unwrap();
    assert_eq!(outcome.box_texts, vec!["Fixing the bug", "Shipping three new ones"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_survivor_skips_evaluation() {
    let reply: Reply = Box::new(|call: Call, prompt: &str| match call {
        Call::Caption if prompt.contains("variant 2 of") => Ok("lol no".to_string()),
        _ => happy_reply(call, prompt),
    });
    let h = Harness::new(reply, url_renderer(), options());

    let state = h.orchestrator.run_state(IDEA).await;
    assert_eq!(state.stage(), Stage::Rendered);
    assert_eq!(h.count(Call::Evaluation), 0);
    // Slot 2: first attempt plus one corrective retry
    assert_eq!(h.count(Call::Caption), 3);
    match &state.trace()[1].outcome {
        StageOutcome::CandidatesGenerated { candidates, dropped } => {
            assert_eq!(candidates.len(), 1);
            assert_eq!(*dropped, 1);
        }
        other => panic!("unexpected trace entry: {other:?}"),
    }
    match &state.trace()[2].outcome {
        StageOutcome::CandidateSelected {
            chosen_index,
            evaluated,
            ..
        } => {
            assert_eq!(*chosen_index, 0);
            assert!(!evaluated);
        }
        other => panic!("unexpected trace entry: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_box_count_is_repaired() {
    let reply: Reply = Box::new(|call: Call, prompt: &str| match call {
        Call::Caption if !prompt.contains("previous answer was rejected") => {
            Ok(r#"{"box_texts": ["one", "two", "three"]}"#.to_string())
        }
        Call::Caption => Ok(r#"["fixed top", "fixed bottom"]"#.to_string()),
        _ => happy_reply(call, prompt),
    });
    let h = Harness::new(reply, url_renderer(), options());

    let state = h.orchestrator.run_state(IDEA).await;
    assert_eq!(state.stage(), Stage::Rendered);
    assert_eq!(state.candidates().len(), 2);
    for candidate in state.candidates() {
        assert_eq!(candidate.box_texts.len(), 2);
    }
    assert_eq!(h.count(Call::Caption), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zero_candidates_fails_run() {
    let reply: Reply = Box::new(|call: Call, prompt: &str| match call {
        Call::Caption => Ok(r#"{"box_texts": ["just one"]}"#.to_string()),
        _ => happy_reply(call, prompt),
    });
    let h = Harness::new(reply, url_renderer(), options());

    let state = h.orchestrator.run_state(IDEA).await;
    assert_eq!(state.stage(), Stage::Failed);
    assert_eq!(h.render_calls.load(Ordering::SeqCst), 0);

    let record = state.into_outcome().unwrap_err();
    assert_eq!(record.stage, Stage::CandidatesGenerated);
    assert_eq!(record.kind, ErrorKind::ExhaustedRetries);
    assert!(record.retryable);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_template_id_falls_back_to_catalog_member() {
    let reply: Reply = Box::new(|call: Call, prompt: &str| match call {
        Call::Template => Ok(r#"{"template_id": "does-not-exist"}"#.to_string()),
        _ => happy_reply(call, prompt),
    });
    let h = Harness::new(reply, url_renderer(), options());

    let outcome = h.orchestrator.run(IDEA).await.unwrap();
    assert!(catalog().contains(&outcome.template));
    assert_eq!(outcome.template.id, DRAKE_ID);
    // First attempt plus template_retries corrective prompts
    assert_eq!(h.count(Call::Template), 3);
    match &outcome.trace[0].outcome {
        StageOutcome::TemplateChosen { fallback, .. } => {
            assert!(fallback.as_deref().unwrap().contains("does-not-exist"));
        }
        other => panic!("unexpected trace entry: {other:?}"),
    }
    assert_eq!(outcome.trace[0].attempts, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_template_fallback_uses_configured_default() {
    let reply: Reply = Box::new(|call: Call, prompt: &str| match call {
        Call::Template => Err(WorkflowError::Provider {
            message: "HTTP 401".to_string(),
            status_code: Some(401),
        }),
        Call::Caption => Ok(r#"["a", "b", "c"]"#.to_string()),
        _ => happy_reply(call, prompt),
    });
    let mut opts = options();
    opts.default_template_id = Some("Distracted Boyfriend".to_string());
    let h = Harness::new(reply, url_renderer(), opts);

    let outcome = h.orchestrator.run(IDEA).await.unwrap();
    assert_eq!(outcome.template.id, "112126428");
    assert_eq!(outcome.box_texts.len(), 3);
    // Provider failures are not re-prompted
    assert_eq!(h.count(Call::Template), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_always_transient_renderer_exhausts_retries() {
    let renderer = StubRenderer {
        reply: Box::new(|_: u32, _: &[String]| {
            Err(RenderError::Transient {
                message: "HTTP 503".to_string(),
                status_code: Some(503),
            })
        }),
        calls: Arc::new(AtomicU32::new(0)),
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let h = Harness::new(Box::new(happy_reply), renderer, options());

    let record = h.orchestrator.run(IDEA).await.unwrap_err();
    assert_eq!(h.render_calls.load(Ordering::SeqCst), 3 + 1);
    assert_eq!(record.stage, Stage::Rendered);
    assert_eq!(record.kind, ErrorKind::ExhaustedRetries);
    assert!(record.message.contains("HTTP 503"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transient_then_success_renders() {
    let renderer = StubRenderer {
        reply: Box::new(|idx: u32, _: &[String]| {
            if idx < 2 {
                Err(RenderError::Transient {
                    message: "timed out".to_string(),
                    status_code: None,
                })
            } else {
                Ok("https://i.imgflip.com/ok.jpg".to_string())
            }
        }),
        calls: Arc::new(AtomicU32::new(0)),
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let h = Harness::new(Box::new(happy_reply), renderer, options());

    let state = h.orchestrator.run_state(IDEA).await;
    assert_eq!(state.final_image_ref(), Some("https://i.imgflip.com/ok.jpg"));
    assert_eq!(state.trace().last().unwrap().attempts, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_auth_failure_is_not_retried() {
    let renderer = StubRenderer {
        reply: Box::new(|_: u32, _: &[String]| {
            Err(RenderError::Auth("Invalid username/password".to_string()))
        }),
        calls: Arc::new(AtomicU32::new(0)),
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let h = Harness::new(Box::new(happy_reply), renderer, options());

    let record = h.orchestrator.run(IDEA).await.unwrap_err();
    assert_eq!(h.render_calls.load(Ordering::SeqCst), 1);
    assert_eq!(record.kind, ErrorKind::Auth);
    assert!(!record.retryable);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_idea_fails_without_calls() {
    let h = Harness::new(Box::new(happy_reply), url_renderer(), options());

    let record = h.orchestrator.run("   ").await.unwrap_err();
    assert_eq!(record.stage, Stage::Init);
    assert_eq!(record.kind, ErrorKind::Validation);
    assert!(h.llm_calls.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_catalog_failure_fails_template_stage() {
    let h = Harness::build(
        Box::new(happy_reply),
        url_renderer(),
        options(),
        Err(WorkflowError::Provider {
            message: "HTTP 403".to_string(),
            status_code: Some(403),
        }),
        false,
    );

    let record = h.orchestrator.run(IDEA).await.unwrap_err();
    assert_eq!(record.stage, Stage::TemplateSelected);
    assert_eq!(record.kind, ErrorKind::Provider);
    assert!(h.llm_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_workflow_reports_missing_credentials_as_config() {
    let mut config = Config::default();
    config.renderer.username = "${MEMEFORGE_TEST_MISSING_USER}".to_string();
    config.renderer.password = "${MEMEFORGE_TEST_MISSING_PASS}".to_string();

    let record = run_workflow(IDEA, &config).await.unwrap_err();
    assert_eq!(record.kind, ErrorKind::Config);
    assert_eq!(record.stage, Stage::Init);
    assert!(!record.retryable);
}
