//! Core data types for the meme workflow.
//!
//! These types describe what flows between stages: the templates offered by
//! the catalog, the caption candidates produced by the LLM, the selection,
//! and the trace of decisions returned to callers.

use crate::error::ErrorRecord;
use serde::{Deserialize, Serialize};

/// A meme layout offered by the template provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Provider-assigned identifier (e.g. Imgflip's "181913649")
    pub id: String,

    /// Human-readable name ("Drake Hotline Bling")
    pub name: String,

    /// Number of text boxes the layout expects (always >= 1)
    pub box_count: usize,

    /// Blank template image, if the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_url: Option<String>,
}

impl Template {
    pub fn new(id: impl Into<String>, name: impl Into<String>, box_count: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            box_count,
            example_url: None,
        }
    }
}

/// One complete set of caption texts for every box of the selected template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionCandidate {
    /// Box texts in template order; length equals the template's `box_count`
    pub box_texts: Vec<String>,

    /// Model's short explanation of the joke, if it gave one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Outcome of the evaluation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Position of the chosen candidate in the run's candidate list
    pub chosen_index: usize,

    /// Why this candidate was picked
    pub justification: String,
}

/// Pipeline stages, in the only order a run may move through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Init,
    TemplateSelected,
    CandidatesGenerated,
    Selected,
    Rendered,
    Failed,
}

impl Stage {
    /// Whether the run can go from `self` to `next`.
    ///
    /// Only the immediate successor is allowed, or `Failed` from any
    /// non-terminal stage.
    pub fn can_advance_to(self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Stage::Failed => true,
            _ => next as u8 == self as u8 + 1,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Rendered | Stage::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "INIT",
            Stage::TemplateSelected => "TEMPLATE_SELECTED",
            Stage::CandidatesGenerated => "CANDIDATES_GENERATED",
            Stage::Selected => "SELECTED",
            Stage::Rendered => "RENDERED",
            Stage::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// What a stage decided, as recorded in the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutcome {
    TemplateChosen {
        template_id: String,
        template_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rationale: Option<String>,
        /// Set when the deterministic default replaced the model's choice
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<String>,
    },
    CandidatesGenerated {
        candidates: Vec<CaptionCandidate>,
        /// Slots that produced no usable candidate
        dropped: usize,
    },
    CandidateSelected {
        chosen_index: usize,
        justification: String,
        /// False when only one candidate survived and no evaluation call was made
        evaluated: bool,
        /// True when index 0 was used because the model's answer was unusable
        defaulted: bool,
    },
    Rendered {
        image_ref: String,
    },
    Failed {
        error: ErrorRecord,
    },
}

/// One entry of the run trace.
///
/// Carries no timestamps or latencies: identical inputs produce identical
/// traces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage reached by this step
    pub stage: Stage,

    /// External calls made while producing this result (including retries)
    pub attempts: u32,

    pub outcome: StageOutcome,
}

/// Successful result of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemeOutcome {
    /// URL (or other reference) of the rendered meme
    pub final_image_ref: String,

    /// Template the meme was rendered on
    pub template: Template,

    /// Texts that were rendered, in box order
    pub box_texts: Vec<String>,

    /// Ordered record of every stage decision
    pub trace: Vec<StageRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_monotonic() {
        assert!(Stage::Init.can_advance_to(Stage::TemplateSelected));
        assert!(Stage::TemplateSelected.can_advance_to(Stage::CandidatesGenerated));
        assert!(Stage::CandidatesGenerated.can_advance_to(Stage::Selected));
        assert!(Stage::Selected.can_advance_to(Stage::Rendered));
    }

    #[test]
    fn test_stage_rejects_skips_and_reentry() {
        assert!(!Stage::Init.can_advance_to(Stage::Selected));
        assert!(!Stage::Selected.can_advance_to(Stage::TemplateSelected));
        assert!(!Stage::TemplateSelected.can_advance_to(Stage::TemplateSelected));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        assert!(Stage::Init.can_advance_to(Stage::Failed));
        assert!(Stage::Selected.can_advance_to(Stage::Failed));
        assert!(!Stage::Rendered.can_advance_to(Stage::Failed));
        assert!(!Stage::Failed.can_advance_to(Stage::Failed));
    }

    #[test]
    fn test_stage_serializes_screaming_snake() {
        let json = serde_json::to_string(&Stage::CandidatesGenerated).unwrap();
        assert_eq!(json, "\"CANDIDATES_GENERATED\"");
        assert_eq!(Stage::TemplateSelected.to_string(), "TEMPLATE_SELECTED");
    }

    #[test]
    fn test_outcome_tagged_serialization() {
        let record = StageRecord {
            stage: Stage::Rendered,
            attempts: 1,
            outcome: StageOutcome::Rendered {
                image_ref: "https://i.imgflip.com/abc.jpg".to_string(),
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"]["kind"], "rendered");
        assert_eq!(json["stage"], "RENDERED");
    }
}
