//! Output formatting for run reports.
//!
//! A [`RunReport`] is the serialized view of a finished run (success or
//! failure); [`OutputWriter`] writes reports as pretty/compact JSON or as
//! JSON Lines.

use crate::error::{ErrorRecord, WorkflowError};
use crate::types::{Stage, StageRecord, Template};
use crate::workflow::WorkflowState;
use serde::Serialize;
use std::io::{self, Write};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON document per run
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializable summary of a terminal [`WorkflowState`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunReport<'a> {
    Rendered {
        idea: &'a str,
        final_image_ref: &'a str,
        template: &'a Template,
        box_texts: &'a [String],
        #[serde(skip_serializing_if = "Option::is_none")]
        trace: Option<&'a [StageRecord]>,
    },
    Failed {
        idea: &'a str,
        error: ErrorRecord,
        #[serde(skip_serializing_if = "Option::is_none")]
        trace: Option<&'a [StageRecord]>,
    },
}

impl<'a> RunReport<'a> {
    pub fn from_state(state: &'a WorkflowState, include_trace: bool) -> Self {
        let trace = include_trace.then(|| state.trace());
        match (state.final_image_ref(), state.template(), state.chosen()) {
            (Some(image_ref), Some(template), Some(chosen)) if state.stage() == Stage::Rendered => {
                RunReport::Rendered {
                    idea: state.user_idea(),
                    final_image_ref: image_ref,
                    template,
                    box_texts: &chosen.box_texts,
                    trace,
                }
            }
            _ => RunReport::Failed {
                idea: state.user_idea(),
                error: state.error().cloned().unwrap_or_else(|| {
                    ErrorRecord::from_workflow(
                        state.stage(),
                        &WorkflowError::Validation(format!(
                            "run stopped unfinished at {}",
                            state.stage()
                        )),
                    )
                }),
                trace,
            },
        }
    }
}

/// A writer that serializes items to JSON or JSONL format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`]; JSON Lines is always compact.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
        }
    }

    /// Write a single item followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaptionCandidate, SelectionResult};

    fn rendered_state() -> WorkflowState {
        WorkflowState::new("cats vs mondays")
            .template_selected(Template::new("61579", "One Does Not Simply", 2), None, None, 1)
            .unwrap()
            .candidates_generated(
                vec![CaptionCandidate {
                    box_texts: vec!["One does not simply".into(), "skip Monday".into()],
                    rationale: None,
                }],
                0,
                1,
            )
            .unwrap()
            .selected(
                SelectionResult {
                    chosen_index: 0,
                    justification: "only one".into(),
                },
                false,
                false,
                0,
            )
            .unwrap()
            .rendered("https://i.imgflip.com/1.jpg".into(), 1)
            .unwrap()
    }

    #[test]
    fn test_rendered_report_json() {
        let state = rendered_state();
        let report = RunReport::from_state(&state, true);
        assert!(matches!(report, RunReport::Rendered { .. }));

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "rendered");
        assert_eq!(json["final_image_ref"], "https://i.imgflip.com/1.jpg");
        assert_eq!(json["box_texts"][1], "skip Monday");
        assert_eq!(json["trace"].as_array().unwrap().len(), 4);
        assert_eq!(json["trace"][0]["outcome"]["kind"], "template_chosen");
    }

    #[test]
    fn test_report_without_trace() {
        let state = rendered_state();
        let json = serde_json::to_string(&RunReport::from_state(&state, false)).unwrap();
        assert!(!json.contains("\"trace\""));
    }

    #[test]
    fn test_failed_report_carries_error_record() {
        let state = WorkflowState::new("").fail(
            Stage::Init,
            &WorkflowError::Validation("meme idea is empty".into()),
            0,
        );
        let report = RunReport::from_state(&state, true);
        assert!(matches!(report, RunReport::Failed { .. }));

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["stage"], "INIT");
        assert_eq!(json["error"]["kind"], "validation");
        assert_eq!(json["error"]["retryable"], true);
    }

    #[test]
    fn test_write_jsonl_is_one_line_per_item() {
        let state = rendered_state();
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true);
        writer.write(&RunReport::from_state(&state, true)).unwrap();
        writer.write(&RunReport::from_state(&state, false)).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output.trim().lines().count(), 2);
    }

    #[test]
    fn test_write_pretty_json_is_multiline() {
        let state = rendered_state();
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, true);
        writer.write(&RunReport::from_state(&state, false)).unwrap();
        assert!(String::from_utf8(buffer).unwrap().lines().count() > 1);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("JSONL"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }
}
