//! Stage 2: generate caption candidates.

use super::prompts::{caption_prompt, correct_caption_prompt, Rejection};
use super::repair::{complete_validated, RepairPolicy};
use super::schema::CaptionSet;
use crate::llm::{LlmClient, StructuredPrompt};
use crate::types::{CaptionCandidate, Template};
use futures_util::future::join_all;

/// Surviving candidates in request order.
#[derive(Debug, Clone, Default)]
pub(crate) struct CandidateBatch {
    pub candidates: Vec<CaptionCandidate>,
    pub dropped: usize,
    /// LLM calls across every slot
    pub attempts: u32,
    /// Reason the last dropped slot failed
    pub last_error: Option<String>,
}

/// Check a caption set against the template and normalize it.
pub fn validate_caption_set(set: CaptionSet, box_count: usize) -> Result<CaptionCandidate, String> {
    if set.box_texts.len() != box_count {
        return Err(format!(
            "got {} texts but the template has {box_count} boxes",
            set.box_texts.len()
        ));
    }
    let box_texts: Vec<String> = set.box_texts.iter().map(|t| t.trim().to_string()).collect();
    if box_texts.iter().all(|t| t.is_empty()) {
        return Err("every text box was empty".to_string());
    }
    Ok(CaptionCandidate {
        box_texts,
        rationale: set.rationale.filter(|r| !r.trim().is_empty()),
    })
}

/// Request `count` caption sets concurrently.
///
/// Each slot has its own repair budget; a slot that never produces a valid
/// set is dropped without affecting the others.
pub(crate) async fn generate_candidates(
    llm: &LlmClient,
    idea: &str,
    template: &Template,
    count: usize,
    caption_retries: u32,
) -> CandidateBatch {
    let box_count = template.box_count;
    let policy = RepairPolicy {
        max_corrections: caption_retries,
        validate: |set: CaptionSet| validate_caption_set(set, box_count),
        correct: |prev: &StructuredPrompt, rejection: &Rejection| {
            correct_caption_prompt(prev, rejection, box_count)
        },
    };

    let prompts: Vec<StructuredPrompt> = (0..count)
        .map(|slot| caption_prompt(idea, template, slot, count))
        .collect();
    let results = join_all(
        prompts
            .iter()
            .map(|prompt| complete_validated(llm, prompt, &policy)),
    )
    .await;

    let mut batch = CandidateBatch::default();
    for (slot, result) in results.into_iter().enumerate() {
        match result {
            Ok(repaired) => {
                batch.attempts += repaired.attempts;
                batch.candidates.push(repaired.value);
            }
            Err(failure) => {
                tracing::warn!("Dropping caption slot {slot}: {}", failure.error);
                batch.attempts += failure.attempts;
                batch.dropped += 1;
                batch.last_error = Some(failure.error.to_string());
            }
        }
    }

    tracing::info!(
        "Generated {}/{count} caption candidates",
        batch.candidates.len()
    );
    batch
}
