//! Prompt builders for each stage, plus the corrective builders used by
//! repair retries. All of them are pure functions.

use crate::llm::StructuredPrompt;
use crate::types::{CaptionCandidate, Template};

const TEMPLATE_SYSTEM: &str = "You are a meme expert. You know which meme formats \
fit which kinds of jokes, and you only ever pick formats from the list you are given.";

const CAPTION_SYSTEM: &str = "You are a witty meme writer. You write short, punchy \
captions that fit the chosen meme format. Never explain the joke inside the captions.";

const EVALUATION_SYSTEM: &str = "You are a strict comedy judge. You compare meme \
captions and pick the one most likely to make people laugh.";

/// Why the previous answer was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The answer was not in the requested layout
    Unparseable { message: String, raw: String },
    /// The answer parsed but broke a rule (unknown id, wrong box count, ...)
    Invalid { reason: String },
}

fn template_line(template: &Template) -> String {
    format!(
        "- {}: {} ({} text boxes)",
        template.id, template.name, template.box_count
    )
}

fn excerpt(raw: &str) -> String {
    const MAX: usize = 200;
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Ask for the single best-fitting template out of `templates`.
pub fn template_prompt(idea: &str, templates: &[Template]) -> StructuredPrompt {
    let listing: Vec<String> = templates.iter().map(template_line).collect();
    StructuredPrompt::new(
        TEMPLATE_SYSTEM,
        idea,
        "Choose the one meme template from the list above that best fits the idea. \
         Use its id exactly as listed.",
    )
    .with_context("Available templates", listing.join("\n"))
}

/// Corrective template prompt: restate every listed id as the full set of
/// valid answers.
pub fn correct_template_prompt(
    previous: &StructuredPrompt,
    rejection: &Rejection,
    valid_ids: &[&str],
) -> StructuredPrompt {
    let ids = valid_ids.join(", ");
    let note = match rejection {
        Rejection::Unparseable { raw, .. } => format!(
            "Your answer was not valid JSON: \"{}\". Answer with the JSON object only. \
             The only valid ids are those under Available templates: {ids}.",
            excerpt(raw)
        ),
        Rejection::Invalid { reason } => format!(
            "{reason}. The template_id must be copied from Available templates; \
             the only valid ids are: {ids}."
        ),
    };
    previous.corrected(note)
}

/// Ask for one caption set for `template`.
///
/// `variant` and `total` tell the model which of the independent requests
/// this is, so parallel calls aim at different jokes.
pub fn caption_prompt(
    idea: &str,
    template: &Template,
    variant: usize,
    total: usize,
) -> StructuredPrompt {
    let boxes = template.box_count;
    let mut task = format!(
        "Write captions for the \"{}\" meme about the idea. The template has exactly \
         {boxes} text boxes, so give exactly {boxes} texts, one per box, in order.",
        template.name
    );
    if total > 1 {
        task.push_str(&format!(
            " This is variant {} of {total}; take a different comedic angle than the obvious one.",
            variant + 1
        ));
    }
    StructuredPrompt::new(CAPTION_SYSTEM, idea, task)
        .with_context("Template", template_line(template))
}

/// Corrective caption prompt: restate the exact box count.
pub fn correct_caption_prompt(
    previous: &StructuredPrompt,
    rejection: &Rejection,
    box_count: usize,
) -> StructuredPrompt {
    let note = match rejection {
        Rejection::Unparseable { raw, .. } => format!(
            "Your answer could not be read: \"{}\". Reply with the JSON object only, \
             with exactly {box_count} strings in box_texts.",
            excerpt(raw)
        ),
        Rejection::Invalid { reason } => {
            format!("{reason}. box_texts must contain exactly {box_count} non-empty strings.")
        }
    };
    previous.corrected(note)
}

/// Ask the model to pick the funniest of `candidates` by index.
pub fn evaluation_prompt(
    idea: &str,
    template: &Template,
    candidates: &[CaptionCandidate],
) -> StructuredPrompt {
    let listing: Vec<String> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let texts: Vec<String> = c
                .box_texts
                .iter()
                .enumerate()
                .map(|(b, t)| format!("box {}: \"{t}\"", b + 1))
                .collect();
            format!("[{i}] {}", texts.join(" | "))
        })
        .collect();

    StructuredPrompt::new(
        EVALUATION_SYSTEM,
        idea,
        format!(
            "Pick the funniest candidate for the \"{}\" meme and justify the choice. \
             Indices start at 0; the last valid index is {}.",
            template.name,
            candidates.len().saturating_sub(1)
        ),
    )
    .with_context("Candidates", listing.join("\n"))
}
