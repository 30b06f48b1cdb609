//! Answer layouts the workflow asks the model for.

use crate::llm::schema::{integer_or_string, string_or_number};
use crate::llm::ResponseSchema;
use serde::Deserialize;

/// Template-selection answer.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TemplateChoice {
    #[serde(alias = "id", alias = "template", deserialize_with = "string_or_number")]
    pub template_id: String,

    #[serde(default, alias = "reason")]
    pub rationale: Option<String>,
}

impl ResponseSchema for TemplateChoice {
    const NAME: &'static str = "template_choice";

    fn format_instructions() -> String {
        r#"Reply with a single JSON object and nothing else:
{"template_id": "<id copied exactly from the list>", "rationale": "<one short sentence>"}"#
            .to_string()
    }
}

/// One caption set.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaptionSet {
    #[serde(alias = "captions", alias = "texts", alias = "boxes")]
    pub box_texts: Vec<String>,

    #[serde(default, alias = "reason")]
    pub rationale: Option<String>,
}

impl ResponseSchema for CaptionSet {
    const NAME: &'static str = "caption_set";

    fn format_instructions() -> String {
        r#"Reply with a single JSON object and nothing else:
{"box_texts": ["<text for box 1>", "<text for box 2>", ...], "rationale": "<why it is funny>"}
"box_texts" must contain exactly one string per text box, in box order."#
            .to_string()
    }

    fn from_bare_list(items: Vec<String>) -> Option<Self> {
        Some(Self {
            box_texts: items,
            rationale: None,
        })
    }
}

/// Evaluation answer. The index is kept signed so that a negative answer
/// parses and is then treated as out of range.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Evaluation {
    #[serde(
        alias = "index",
        alias = "best_index",
        alias = "choice",
        deserialize_with = "integer_or_string"
    )]
    pub chosen_index: i64,

    #[serde(default, alias = "reason", alias = "rationale")]
    pub justification: String,
}

impl ResponseSchema for Evaluation {
    const NAME: &'static str = "evaluation";

    fn format_instructions() -> String {
        r#"Reply with a single JSON object and nothing else:
{"chosen_index": <0-based index of the funniest candidate>, "justification": "<one or two sentences>"}"#
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parse_response;

    #[test]
    fn test_template_choice_accepts_numeric_id() {
        let choice: TemplateChoice =
            parse_response(r#"{"template_id": 181913649, "reason": "classic"}"#).unwrap();
        assert_eq!(choice.template_id, "181913649");
        assert_eq!(choice.rationale.as_deref(), Some("classic"));
    }

    #[test]
    fn test_template_choice_alias() {
        let choice: TemplateChoice = parse_response(r#"{"id": " 61579 "}"#).unwrap();
        assert_eq!(choice.template_id, "61579");
        assert!(choice.rationale.is_none());
    }

    #[test]
    fn test_caption_set_from_bare_list() {
        let set: CaptionSet = parse_response("```json\n[\"top\", \"bottom\"]\n```").unwrap();
        assert_eq!(set.box_texts, vec!["top", "bottom"]);
    }

    #[test]
    fn test_caption_set_alias() {
        let set: CaptionSet =
            parse_response(r#"{"captions": ["a", "b"], "rationale": "irony"}"#).unwrap();
        assert_eq!(set.box_texts, vec!["a", "b"]);
    }

    #[test]
    fn test_evaluation_negative_index_parses() {
        let eval: Evaluation = parse_response(r#"{"chosen_index": -1}"#).unwrap();
        assert_eq!(eval.chosen_index, -1);
        assert!(eval.justification.is_empty());
    }

    #[test]
    fn test_evaluation_index_as_string_or_float() {
        let eval: Evaluation =
            parse_response(r#"{"chosen_index": "1", "justification": "sharper"}"#).unwrap();
        assert_eq!(eval.chosen_index, 1);

        let eval: Evaluation = parse_response(r#"{"best_index": " 2 "}"#).unwrap();
        assert_eq!(eval.chosen_index, 2);

        let eval: Evaluation = parse_response(r#"{"chosen_index": 1.0}"#).unwrap();
        assert_eq!(eval.chosen_index, 1);
    }

    #[test]
    fn test_evaluation_rejects_non_integral_index() {
        for raw in [
            r#"{"chosen_index": "abc"}"#,
            r#"{"chosen_index": 1.5}"#,
            r#"{"chosen_index": null}"#,
        ] {
            let err = parse_response::<Evaluation>(raw).unwrap_err();
            assert!(
                matches!(err, crate::error::WorkflowError::Parse { .. }),
                "{raw}: {err:?}"
            );
        }
    }
}
