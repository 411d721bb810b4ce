use std::time::Instant;

use testimonial_store::KeyValueStore;
use tracing::debug;

use crate::repository::RecommendationRepository;
use crate::surface::RenderingSurface;
use crate::workflow::{
    apply_effects, FormInput, SubmissionOutcome, SubmissionWorkflow, WorkflowState,
};

/// Binds the repository and workflow to a rendering surface's events.
#[derive(Debug)]
pub struct Widget<S, R> {
    repository: RecommendationRepository<S>,
    surface: R,
    workflow: SubmissionWorkflow,
}

impl<S: KeyValueStore, R: RenderingSurface> Widget<S, R> {
    pub fn new(repository: RecommendationRepository<S>, surface: R) -> Self {
        Self { repository, surface, workflow: SubmissionWorkflow::new() }
    }

    /// Initial page load: show the merged list and process its icons.
    pub fn on_load(&mut self) {
        let recommendations = self.repository.all();
        debug!(count = recommendations.len(), "rendering recommendations on load");
        self.surface.render_list(&recommendations);
        self.surface.render_icons();
    }

    pub fn on_submit(&mut self, input: &FormInput) -> SubmissionOutcome {
        let submission = self.workflow.handle(input, &mut self.repository);
        apply_effects(&mut self.surface, submission.effects);
        submission.outcome
    }

    pub fn dismiss_feedback(&mut self, now: Instant) {
        self.surface.hide_feedback(now);
    }

    pub fn tick(&mut self, now: Instant) {
        self.surface.tick(now);
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.workflow.state()
    }

    pub fn repository(&self) -> &RecommendationRepository<S> {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut RecommendationRepository<S> {
        &mut self.repository
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut R {
        &mut self.surface
    }

    pub fn into_parts(self) -> (RecommendationRepository<S>, R) {
        (self.repository, self.surface)
    }
}

#[cfg(test)]
mod tests {
    use testimonial_core::{Recommendation, BUILTIN_RECOMMENDATIONS, DEFAULT_STORAGE_KEY};
    use testimonial_store::{LocalStore, MemoryKeyValueStore};

    use super::*;
    use crate::dialog::FADE_OUT;
    use crate::html::HtmlSurface;
    use crate::surface::SubmitControl;
    use crate::workflow::{SUCCESS_FEEDBACK, VALIDATION_FEEDBACK};

    #[derive(Debug, Clone, Eq, PartialEq)]
    enum Call {
        RenderList(Vec<String>),
        RenderIcons,
        ShowFeedback(String),
        HideFeedback,
        SetSubmitControl(SubmitControl),
        ClearForm,
    }

    #[derive(Debug, Default)]
    struct RecordingSurface {
        calls: Vec<Call>,
    }

    impl RenderingSurface for RecordingSurface {
        fn render_list(&mut self, recommendations: &[Recommendation]) {
            self.calls.push(Call::RenderList(
                recommendations.iter().map(|record| record.name.clone()).collect(),
            ));
        }

        fn render_icons(&mut self) {
            self.calls.push(Call::RenderIcons);
        }

        fn show_feedback(&mut self, message: &str) {
            self.calls.push(Call::ShowFeedback(message.to_string()));
        }

        fn hide_feedback(&mut self, _now: Instant) {
            self.calls.push(Call::HideFeedback);
        }

        fn set_submit_control(&mut self, control: SubmitControl) {
            self.calls.push(Call::SetSubmitControl(control));
        }

        fn clear_form(&mut self) {
            self.calls.push(Call::ClearForm);
        }
    }

    fn repository(store: MemoryKeyValueStore) -> RecommendationRepository<MemoryKeyValueStore> {
        RecommendationRepository::new(BUILTIN_RECOMMENDATIONS, LocalStore::new(store))
    }

    #[test]
    fn load_renders_list_then_icons() {
        let mut widget =
            Widget::new(repository(MemoryKeyValueStore::new()), RecordingSurface::default());
        widget.on_load();

        assert_eq!(
            widget.surface().calls,
            vec![
                Call::RenderList(vec![
                    "J. Miller (CTO)".to_string(),
                    "Sarah K.".to_string(),
                    "Alex R.".to_string(),
                ]),
                Call::RenderIcons,
            ]
        );
    }

    #[test]
    fn submit_applies_effects_in_order() {
        let mut widget =
            Widget::new(repository(MemoryKeyValueStore::new()), RecordingSurface::default());

        let outcome = widget.on_submit(&FormInput::new("Dana", "Thorough reviewer"));

        assert!(matches!(outcome, SubmissionOutcome::Submitted(_)));
        let calls = &widget.surface().calls;
        assert_eq!(calls[0], Call::SetSubmitControl(SubmitControl::Busy));
        assert!(matches!(&calls[1], Call::RenderList(names) if names.len() == 4));
        assert_eq!(calls[3], Call::ShowFeedback(SUCCESS_FEEDBACK.to_string()));
        assert_eq!(calls[4], Call::ClearForm);
        assert_eq!(calls[5..], [Call::SetSubmitControl(SubmitControl::Ready), Call::RenderIcons]);
        assert_eq!(widget.state(), WorkflowState::Idle);
    }

    #[test]
    fn validation_error_leaves_store_untouched() {
        let mut widget =
            Widget::new(repository(MemoryKeyValueStore::new()), RecordingSurface::default());

        let outcome = widget.on_submit(&FormInput::new("", "Body"));

        assert!(matches!(outcome, SubmissionOutcome::Rejected(_)));
        assert_eq!(
            widget.surface().calls,
            vec![Call::ShowFeedback(VALIDATION_FEEDBACK.to_string())]
        );
        assert_eq!(widget.repository().store().backend().get(DEFAULT_STORAGE_KEY), Ok(None));
    }

    #[test]
    fn dismiss_forwards_to_surface() {
        let mut widget =
            Widget::new(repository(MemoryKeyValueStore::new()), RecordingSurface::default());
        widget.dismiss_feedback(Instant::now());
        let (_, surface) = widget.into_parts();
        assert_eq!(surface.calls, vec![Call::HideFeedback]);
    }

    #[test]
    fn html_surface_end_to_end() {
        let mut widget =
            Widget::new(repository(MemoryKeyValueStore::new()), HtmlSurface::default());
        widget.on_load();
        widget.surface_mut().fill_form("Dana", "Thorough reviewer");

        let input = widget.surface().form().clone();
        let outcome = widget.on_submit(&input);

        assert!(matches!(outcome, SubmissionOutcome::Submitted(_)));
        let surface = widget.surface();
        assert_eq!(surface.list_html().matches("animated-card").count(), 4);
        assert!(surface.list_html().find("Dana") < surface.list_html().find("J. Miller"));
        assert!(!surface.list_html().contains("<i data-lucide"));
        assert_eq!(surface.form(), &FormInput::default());
        assert_eq!(surface.submit_control(), SubmitControl::Ready);
        assert!(surface.submit_html().contains("lucide-send"));
        assert_eq!(surface.dialog().message(), SUCCESS_FEEDBACK);

        let now = Instant::now();
        widget.dismiss_feedback(now);
        widget.tick(now + FADE_OUT);
        assert!(!widget.surface().dialog().is_attached());
    }

    #[test]
    fn html_surface_keeps_form_on_store_failure() {
        let mut widget =
            Widget::new(repository(MemoryKeyValueStore::with_quota(40)), HtmlSurface::default());
        widget.on_load();
        widget.surface_mut().fill_form("Dana", "A long recommendation that cannot fit");

        let input = widget.surface().form().clone();
        let outcome = widget.on_submit(&input);

        assert!(matches!(outcome, SubmissionOutcome::StoreFailed(_)));
        let surface = widget.surface();
        assert_eq!(surface.form(), &input);
        assert_eq!(surface.submit_control(), SubmitControl::Ready);
        assert!(surface.dialog().message().starts_with("Error saving recommendation locally: "));
        assert_eq!(surface.list_html().matches("animated-card").count(), 3);
    }
}
