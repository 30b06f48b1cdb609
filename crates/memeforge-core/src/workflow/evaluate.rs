//! Stage 3: pick the funniest candidate.

use super::prompts::evaluation_prompt;
use super::schema::Evaluation;
use crate::llm::LlmClient;
use crate::types::{CaptionCandidate, SelectionResult, Template};

#[derive(Debug, Clone)]
pub(crate) struct Choice {
    pub selection: SelectionResult,
    /// Whether an evaluation call was made
    pub evaluated: bool,
    /// Whether index 0 was used because the answer was unusable
    pub defaulted: bool,
    pub attempts: u32,
}

/// Map the model's index onto the candidate list, if it is in range.
pub fn resolve_index(raw: i64, len: usize) -> Option<usize> {
    usize::try_from(raw).ok().filter(|&i| i < len)
}

fn default_choice(reason: String, attempts: u32) -> Choice {
    tracing::warn!("Evaluation unusable, defaulting to candidate 0: {reason}");
    Choice {
        selection: SelectionResult {
            chosen_index: 0,
            justification: format!("Defaulted to the first candidate: {reason}"),
        },
        evaluated: attempts > 0,
        defaulted: true,
        attempts,
    }
}

/// Select a candidate. With a single candidate no call is made.
pub(crate) async fn choose_candidate(
    llm: &LlmClient,
    idea: &str,
    template: &Template,
    candidates: &[CaptionCandidate],
) -> Choice {
    if candidates.len() <= 1 {
        return Choice {
            selection: SelectionResult {
                chosen_index: 0,
                justification: "Only one candidate survived; selected without evaluation"
                    .to_string(),
            },
            evaluated: false,
            defaulted: false,
            attempts: 0,
        };
    }

    let prompt = evaluation_prompt(idea, template, candidates);
    let evaluation = match llm.complete::<Evaluation>(&prompt).await {
        Ok(evaluation) => evaluation,
        Err(e) => return default_choice(e.to_string(), 1),
    };

    match resolve_index(evaluation.chosen_index, candidates.len()) {
        Some(index) => {
            tracing::info!("Evaluator picked candidate {index}");
            Choice {
                selection: SelectionResult {
                    chosen_index: index,
                    justification: evaluation.justification.trim().to_string(),
                },
                evaluated: true,
                defaulted: false,
                attempts: 1,
            }
        }
        None => default_choice(
            format!(
                "index {} is out of range for {} candidates",
                evaluation.chosen_index,
                candidates.len()
            ),
            1,
        ),
    }
}
