//! Run-local workflow state.
//!
//! A [`WorkflowState`] is passed by value from stage to stage. Each
//! transition consumes the state, checks that the move is legal and that the
//! stage's output satisfies the run invariants, appends a trace record, and
//! returns the next state.

use crate::error::{ErrorRecord, WorkflowError};
use crate::types::{
    CaptionCandidate, MemeOutcome, SelectionResult, Stage, StageOutcome, StageRecord, Template,
};

/// Everything known about one run so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowState {
    user_idea: String,
    stage: Stage,
    template: Option<Template>,
    candidates: Vec<CaptionCandidate>,
    selection: Option<SelectionResult>,
    final_image_ref: Option<String>,
    error: Option<ErrorRecord>,
    trace: Vec<StageRecord>,
}

/// A transition that was refused; carries the untouched state back.
#[derive(Debug)]
pub struct Rejected {
    pub state: Box<WorkflowState>,
    /// Stage the run was trying to enter
    pub target: Stage,
    pub error: WorkflowError,
}

impl Rejected {
    /// Turn the refusal into a terminal failure of the target stage.
    pub fn into_failed(self) -> WorkflowState {
        let Rejected {
            state,
            target,
            error,
        } = self;
        state.fail(target, &error, 0)
    }
}

pub type Transition = Result<WorkflowState, Rejected>;

impl WorkflowState {
    pub fn new(user_idea: impl Into<String>) -> Self {
        Self {
            user_idea: user_idea.into().trim().to_string(),
            stage: Stage::Init,
            template: None,
            candidates: Vec::new(),
            selection: None,
            final_image_ref: None,
            error: None,
            trace: Vec::new(),
        }
    }

    pub fn user_idea(&self) -> &str {
        &self.user_idea
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn candidates(&self) -> &[CaptionCandidate] {
        &self.candidates
    }

    pub fn selection(&self) -> Option<&SelectionResult> {
        self.selection.as_ref()
    }

    /// The selected candidate, once a selection has been made.
    pub fn chosen(&self) -> Option<&CaptionCandidate> {
        self.selection
            .as_ref()
            .and_then(|s| self.candidates.get(s.chosen_index))
    }

    pub fn final_image_ref(&self) -> Option<&str> {
        self.final_image_ref.as_deref()
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        self.error.as_ref()
    }

    pub fn trace(&self) -> &[StageRecord] {
        &self.trace
    }

    fn reject(self, target: Stage, error: WorkflowError) -> Transition {
        Err(Rejected {
            state: Box::new(self),
            target,
            error,
        })
    }

    fn check_move(&self, next: Stage) -> Result<(), WorkflowError> {
        if self.stage.can_advance_to(next) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                from: self.stage,
                to: next,
            })
        }
    }

    fn enter(&mut self, next: Stage, attempts: u32, outcome: StageOutcome) {
        tracing::debug!("Workflow {} -> {}", self.stage, next);
        self.stage = next;
        self.trace.push(StageRecord {
            stage: next,
            attempts,
            outcome,
        });
    }

    /// INIT -> TEMPLATE_SELECTED.
    pub fn template_selected(
        mut self,
        template: Template,
        rationale: Option<String>,
        fallback: Option<String>,
        attempts: u32,
    ) -> Transition {
        let next = Stage::TemplateSelected;
        if let Err(e) = self.check_move(next) {
            return self.reject(next, e);
        }
        if template.box_count == 0 {
            let e = WorkflowError::Validation(format!(
                "template '{}' has no text boxes",
                template.name
            ));
            return self.reject(next, e);
        }

        let outcome = StageOutcome::TemplateChosen {
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            rationale,
            fallback,
        };
        self.template = Some(template);
        self.enter(next, attempts, outcome);
        Ok(self)
    }

    /// TEMPLATE_SELECTED -> CANDIDATES_GENERATED.
    ///
    /// Refuses an empty list and any candidate whose box count differs from
    /// the selected template's.
    pub fn candidates_generated(
        mut self,
        candidates: Vec<CaptionCandidate>,
        dropped: usize,
        attempts: u32,
    ) -> Transition {
        let next = Stage::CandidatesGenerated;
        if let Err(e) = self.check_move(next) {
            return self.reject(next, e);
        }
        if candidates.is_empty() {
            let e = WorkflowError::Validation("no caption candidates survived".to_string());
            return self.reject(next, e);
        }
        let box_count = self.template.as_ref().map_or(0, |t| t.box_count);
        if let Some(bad) = candidates.iter().find(|c| c.box_texts.len() != box_count) {
            let e = WorkflowError::Validation(format!(
                "candidate has {} texts, template expects {box_count}",
                bad.box_texts.len()
            ));
            return self.reject(next, e);
        }

        let outcome = StageOutcome::CandidatesGenerated {
            candidates: candidates.clone(),
            dropped,
        };
        self.candidates = candidates;
        self.enter(next, attempts, outcome);
        Ok(self)
    }

    /// CANDIDATES_GENERATED -> SELECTED.
    pub fn selected(
        mut self,
        selection: SelectionResult,
        evaluated: bool,
        defaulted: bool,
        attempts: u32,
    ) -> Transition {
        let next = Stage::Selected;
        if let Err(e) = self.check_move(next) {
            return self.reject(next, e);
        }
        if selection.chosen_index >= self.candidates.len() {
            let e = WorkflowError::Validation(format!(
                "selection index {} out of range for {} candidates",
                selection.chosen_index,
                self.candidates.len()
            ));
            return self.reject(next, e);
        }

        let outcome = StageOutcome::CandidateSelected {
            chosen_index: selection.chosen_index,
            justification: selection.justification.clone(),
            evaluated,
            defaulted,
        };
        self.selection = Some(selection);
        self.enter(next, attempts, outcome);
        Ok(self)
    }

    /// SELECTED -> RENDERED.
    pub fn rendered(mut self, image_ref: String, attempts: u32) -> Transition {
        let next = Stage::Rendered;
        if let Err(e) = self.check_move(next) {
            return self.reject(next, e);
        }
        if image_ref.trim().is_empty() {
            let e = WorkflowError::Validation("renderer returned an empty image reference".into());
            return self.reject(next, e);
        }

        let outcome = StageOutcome::Rendered {
            image_ref: image_ref.clone(),
        };
        self.final_image_ref = Some(image_ref);
        self.enter(next, attempts, outcome);
        Ok(self)
    }

    /// Any non-terminal stage -> FAILED.
    ///
    /// `stage` names the stage that failed. A state that is already terminal
    /// is returned unchanged.
    pub fn fail(mut self, stage: Stage, error: &WorkflowError, attempts: u32) -> Self {
        if let Err(e) = self.check_move(Stage::Failed) {
            tracing::warn!("Ignoring failure on finished run: {e}");
            return self;
        }

        let record = ErrorRecord::from_workflow(stage, error);
        tracing::error!(
            stage = %record.stage,
            kind = %record.kind,
            "Workflow failed: {}",
            record.message
        );
        let outcome = StageOutcome::Failed {
            error: record.clone(),
        };
        self.error = Some(record);
        self.enter(Stage::Failed, attempts, outcome);
        self
    }

    /// Caller-facing result of a finished run.
    pub fn into_outcome(self) -> Result<MemeOutcome, ErrorRecord> {
        let chosen = self.chosen().map(|c| c.box_texts.clone());
        match (self.stage, self.template, self.final_image_ref, chosen) {
            (Stage::Rendered, Some(template), Some(final_image_ref), Some(box_texts)) => {
                Ok(MemeOutcome {
                    final_image_ref,
                    template,
                    box_texts,
                    trace: self.trace,
                })
            }
            (stage, ..) => Err(self.error.unwrap_or_else(|| {
                ErrorRecord::from_workflow(
                    stage,
                    &WorkflowError::Validation(format!("run stopped unfinished at {stage}")),
                )
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn drake() -> Template {
        Template::new("181913649", "Drake Hotline Bling", 2)
    }

    fn candidate(top: &str, bottom: &str) -> CaptionCandidate {
        CaptionCandidate {
            box_texts: vec![top.to_string(), bottom.to_string()],
            rationale: None,
        }
    }

    fn pick(index: usize) -> SelectionResult {
        SelectionResult {
            chosen_index: index,
            justification: "funnier".to_string(),
        }
    }

    fn advance_to_selected() -> WorkflowState {
        WorkflowState::new("idea")
            .template_selected(drake(), None, None, 1)
            .unwrap()
            .candidates_generated(vec![candidate("a", "b"), candidate("c", "d")], 0, 2)
            .unwrap()
            .selected(pick(1), true, false, 1)
            .unwrap()
    }

    #[test]
    fn test_happy_path_builds_trace() {
        let state = advance_to_selected()
            .rendered("https://i.imgflip.com/x.jpg".to_string(), 1)
            .unwrap();

        assert_eq!(state.stage(), Stage::Rendered);
        let stages: Vec<Stage> = state.trace().iter().map(|r| r.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::TemplateSelected,
                Stage::CandidatesGenerated,
                Stage::Selected,
                Stage::Rendered
            ]
        );

        let outcome = state.into_outcome().unwrap();
        assert_eq!(outcome.box_texts, vec!["c", "d"]);
        assert_eq!(outcome.template, drake());
        assert_eq!(outcome.final_image_ref, "https://i.imgflip.com/x.jpg");
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let rejected = WorkflowState::new("idea")
            .selected(pick(0), false, false, 0)
            .unwrap_err();
        assert!(matches!(
            rejected.error,
            WorkflowError::InvalidTransition {
                from: Stage::Init,
                to: Stage::Selected
            }
        ));
        assert_eq!(rejected.state.stage(), Stage::Init);
    }

    #[test]
    fn test_wrong_box_count_candidates_rejected() {
        let bad = CaptionCandidate {
            box_texts: vec!["only one".to_string()],
            rationale: None,
        };
        let rejected = WorkflowState::new("idea")
            .template_selected(drake(), None, None, 1)
            .unwrap()
            .candidates_generated(vec![bad], 0, 1)
            .unwrap_err();
        assert!(matches!(rejected.error, WorkflowError::Validation(_)));

        let failed = rejected.into_failed();
        assert_eq!(failed.stage(), Stage::Failed);
        assert_eq!(failed.error().unwrap().stage, Stage::CandidatesGenerated);
    }

    #[test]
    fn test_out_of_range_selection_rejected() {
        let rejected = WorkflowState::new("idea")
            .template_selected(drake(), None, None, 1)
            .unwrap()
            .candidates_generated(vec![candidate("a", "b")], 1, 2)
            .unwrap()
            .selected(pick(3), true, false, 1)
            .unwrap_err();
        assert!(rejected.error.to_string().contains("out of range"));
    }

    #[test]
    fn test_fail_records_error_and_terminates() {
        let err = WorkflowError::Render(crate::error::RenderError::Auth("bad login".into()));
        let state = advance_to_selected().fail(Stage::Rendered, &err, 1);

        assert_eq!(state.stage(), Stage::Failed);
        let record = state.error().unwrap().clone();
        assert_eq!(record.kind, ErrorKind::Auth);
        assert!(!record.retryable);
        assert!(matches!(
            state.trace().last().unwrap().outcome,
            StageOutcome::Failed { .. }
        ));
        assert_eq!(state.into_outcome().unwrap_err(), record);
    }

    #[test]
    fn test_fail_after_render_is_ignored() {
        let done = advance_to_selected()
            .rendered("https://i.imgflip.com/x.jpg".to_string(), 1)
            .unwrap();
        let trace_len = done.trace().len();
        let still_done = done.fail(Stage::Rendered, &WorkflowError::Validation("late".into()), 0);
        assert_eq!(still_done.stage(), Stage::Rendered);
        assert_eq!(still_done.trace().len(), trace_len);
    }

    #[test]
    fn test_unfinished_run_is_not_an_outcome() {
        let record = advance_to_selected().into_outcome().unwrap_err();
        assert_eq!(record.stage, Stage::Selected);
        assert!(record.message.contains("unfinished"));
    }
}
