//! Bounded corrective-retry loop shared by the LLM stages.

use super::prompts::Rejection;
use crate::error::WorkflowError;
use crate::llm::{LlmClient, ResponseSchema, StructuredPrompt};

/// How a stage validates answers and rephrases after a rejection.
pub(crate) struct RepairPolicy<F, C> {
    /// Corrective re-prompts allowed after the first attempt
    pub max_corrections: u32,
    /// Turn a parsed answer into a usable value, or explain why not
    pub validate: F,
    /// Build the next prompt from the previous one and the rejection
    pub correct: C,
}

#[derive(Debug)]
pub(crate) struct Repaired<V> {
    pub value: V,
    pub attempts: u32,
}

#[derive(Debug)]
pub(crate) struct Unrepaired {
    pub error: WorkflowError,
    pub attempts: u32,
}

impl Rejection {
    fn into_error(self) -> WorkflowError {
        match self {
            Rejection::Unparseable { message, raw } => WorkflowError::Parse { message, raw },
            Rejection::Invalid { reason } => WorkflowError::Validation(reason),
        }
    }
}

/// Ask for a `T`, validate it, and re-prompt with corrections on rejection.
///
/// Provider failures end the loop at once: the client has already walked the
/// fallback chain, and a corrective prompt cannot fix a network problem.
pub(crate) async fn complete_validated<T, V, F, C>(
    llm: &LlmClient,
    initial: &StructuredPrompt,
    policy: &RepairPolicy<F, C>,
) -> Result<Repaired<V>, Unrepaired>
where
    T: ResponseSchema,
    F: Fn(T) -> Result<V, String>,
    C: Fn(&StructuredPrompt, &Rejection) -> StructuredPrompt,
{
    let mut prompt = initial.clone();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let rejection = match llm.complete::<T>(&prompt).await {
            Ok(answer) => match (policy.validate)(answer) {
                Ok(value) => return Ok(Repaired { value, attempts }),
                Err(reason) => Rejection::Invalid { reason },
            },
            Err(WorkflowError::Parse { message, raw }) => Rejection::Unparseable { message, raw },
            Err(error) => return Err(Unrepaired { error, attempts }),
        };

        if attempts > policy.max_corrections {
            return Err(Unrepaired {
                error: rejection.into_error(),
                attempts,
            });
        }

        tracing::warn!(
            schema = T::NAME,
            attempt = attempts,
            "Rejected model answer, re-prompting: {rejection:?}"
        );
        prompt = (policy.correct)(&prompt, &rejection);
    }
}
