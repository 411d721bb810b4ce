use testimonial_core::{Recommendation, ValidatedSubmission, ValidationError};
use testimonial_store::{KeyValueStore, StoreError};
use tracing::{error, warn};

use crate::repository::RecommendationRepository;
use crate::surface::{RenderingSurface, SubmitControl};

pub const VALIDATION_FEEDBACK: &str = "Error: Please fill in both fields.";

pub const SUCCESS_FEEDBACK: &str = "Success! Your recommendation was submitted locally.";

/// Raw values of the recommendation form, untrimmed.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FormInput {
    pub name: String,
    pub recommendation_text: String,
}

impl FormInput {
    pub fn new(name: impl Into<String>, recommendation_text: impl Into<String>) -> Self {
        Self { name: name.into(), recommendation_text: recommendation_text.into() }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WorkflowState {
    Idle,
    Validating,
    Persisting,
}

/// One surface mutation requested by the workflow.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Effect {
    SetSubmitControl(SubmitControl),
    RenderList(Vec<Recommendation>),
    RenderIcons,
    ShowFeedback(String),
    ClearForm,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubmissionOutcome {
    Submitted(Recommendation),
    Rejected(ValidationError),
    StoreFailed(StoreError),
    /// A submission was already in flight.
    Ignored,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Submission {
    pub outcome: SubmissionOutcome,
    pub effects: Vec<Effect>,
}

/// Decides what a form submit does; never touches a surface.
#[derive(Debug, Clone)]
pub struct SubmissionWorkflow {
    state: WorkflowState,
}

impl Default for SubmissionWorkflow {
    fn default() -> Self {
        Self { state: WorkflowState::Idle }
    }
}

impl SubmissionWorkflow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Validate, persist and describe the resulting surface updates in order.
    /// Always returns to [`WorkflowState::Idle`].
    pub fn handle<S: KeyValueStore>(
        &mut self,
        input: &FormInput,
        repository: &mut RecommendationRepository<S>,
    ) -> Submission {
        if self.state != WorkflowState::Idle {
            warn!(state = ?self.state, "ignoring submit while another is in flight");
            return Submission { outcome: SubmissionOutcome::Ignored, effects: Vec::new() };
        }

        self.state = WorkflowState::Validating;
        let submission = match ValidatedSubmission::parse(&input.name, &input.recommendation_text)
        {
            Ok(submission) => submission,
            Err(err) => {
                self.state = WorkflowState::Idle;
                return Submission {
                    outcome: SubmissionOutcome::Rejected(err),
                    effects: vec![Effect::ShowFeedback(VALIDATION_FEEDBACK.to_string())],
                };
            }
        };

        self.state = WorkflowState::Persisting;
        let mut effects = vec![Effect::SetSubmitControl(SubmitControl::Busy)];
        let outcome = match repository.submit_validated(submission) {
            Ok(record) => {
                effects.push(Effect::RenderList(repository.all()));
                effects.push(Effect::RenderIcons);
                effects.push(Effect::ShowFeedback(SUCCESS_FEEDBACK.to_string()));
                effects.push(Effect::ClearForm);
                SubmissionOutcome::Submitted(record)
            }
            Err(err) => {
                error!(error = %err, "error saving recommendation locally");
                effects.push(Effect::ShowFeedback(format!(
                    "Error saving recommendation locally: {err}"
                )));
                SubmissionOutcome::StoreFailed(err)
            }
        };

        effects.push(Effect::SetSubmitControl(SubmitControl::Ready));
        effects.push(Effect::RenderIcons);
        self.state = WorkflowState::Idle;

        Submission { outcome, effects }
    }
}

/// Replay effects onto a surface in order.
pub fn apply_effects<R: RenderingSurface + ?Sized>(surface: &mut R, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::SetSubmitControl(control) => surface.set_submit_control(control),
            Effect::RenderList(recommendations) => surface.render_list(&recommendations),
            Effect::RenderIcons => surface.render_icons(),
            Effect::ShowFeedback(message) => surface.show_feedback(&message),
            Effect::ClearForm => surface.clear_form(),
        }
    }
}

#[cfg(test)]
mod tests {
    use testimonial_core::BUILTIN_RECOMMENDATIONS;
    use testimonial_store::{LocalStore, MemoryKeyValueStore};

    use super::*;

    fn repository(store: MemoryKeyValueStore) -> RecommendationRepository<MemoryKeyValueStore> {
        RecommendationRepository::new(BUILTIN_RECOMMENDATIONS, LocalStore::new(store))
    }

    #[test]
    fn blank_field_only_shows_validation_feedback() {
        let mut repo = repository(MemoryKeyValueStore::new());
        let mut workflow = SubmissionWorkflow::new();

        let submission = workflow.handle(&FormInput::new("Ann", "   "), &mut repo);

        assert_eq!(submission.outcome, SubmissionOutcome::Rejected(ValidationError::EmptyText));
        assert_eq!(
            submission.effects,
            vec![Effect::ShowFeedback(VALIDATION_FEEDBACK.to_string())]
        );
        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert_eq!(repo.all().len(), 3);
    }

    #[test]
    fn success_rerenders_clears_form_and_restores_control() {
        let mut repo = repository(MemoryKeyValueStore::new());
        let mut workflow = SubmissionWorkflow::new();

        let submission = workflow.handle(&FormInput::new(" Ann ", "Kind and sharp"), &mut repo);

        let SubmissionOutcome::Submitted(record) = &submission.outcome else {
            panic!("expected success, got {:?}", submission.outcome);
        };
        assert_eq!(record.name, "Ann");

        let Some(Effect::RenderList(list)) = submission.effects.get(1) else {
            panic!("second effect should render the list: {:?}", submission.effects);
        };
        assert_eq!(list.len(), 4);
        assert_eq!(&list[0], record);

        assert_eq!(submission.effects[0], Effect::SetSubmitControl(SubmitControl::Busy));
        assert_eq!(
            submission.effects[2..],
            [
                Effect::RenderIcons,
                Effect::ShowFeedback(SUCCESS_FEEDBACK.to_string()),
                Effect::ClearForm,
                Effect::SetSubmitControl(SubmitControl::Ready),
                Effect::RenderIcons,
            ]
        );
        assert_eq!(workflow.state(), WorkflowState::Idle);
    }

    #[test]
    fn store_failure_keeps_form_and_restores_control() {
        let mut repo = repository(MemoryKeyValueStore::with_quota(32));
        let mut workflow = SubmissionWorkflow::new();

        let submission =
            workflow.handle(&FormInput::new("Ann", "A recommendation too big to fit"), &mut repo);

        let SubmissionOutcome::StoreFailed(err) = &submission.outcome else {
            panic!("expected store failure, got {:?}", submission.outcome);
        };
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
        assert_eq!(
            submission.effects,
            vec![
                Effect::SetSubmitControl(SubmitControl::Busy),
                Effect::ShowFeedback(format!("Error saving recommendation locally: {err}")),
                Effect::SetSubmitControl(SubmitControl::Ready),
                Effect::RenderIcons,
            ]
        );
        assert!(!submission.effects.contains(&Effect::ClearForm));
        assert_eq!(workflow.state(), WorkflowState::Idle);
    }

    #[test]
    fn busy_workflow_ignores_reentrant_submit() {
        let mut repo = repository(MemoryKeyValueStore::new());
        let mut workflow = SubmissionWorkflow { state: WorkflowState::Persisting };

        let submission = workflow.handle(&FormInput::new("Ann", "Twice"), &mut repo);

        assert_eq!(submission.outcome, SubmissionOutcome::Ignored);
        assert!(submission.effects.is_empty());
        assert_eq!(repo.all().len(), 3);
    }
}
