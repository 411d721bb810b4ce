use std::time::Instant;

use testimonial_core::Recommendation;

pub const EMPTY_LIST_MESSAGE: &str = "No recommendations yet. Be the first to add one locally!";

pub const SUBMIT_BUSY_LABEL: &str = "Saving...";

pub const SUBMIT_READY_LABEL: &str =
    r#"Submit Recommendation <i data-lucide="send" class="w-4 h-4 ml-2"></i>"#;

/// State of the form's submit button.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubmitControl {
    Ready,
    Busy,
}

impl SubmitControl {
    /// Button markup; the ready label carries an icon placeholder that needs
    /// a later icon pass.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ready => SUBMIT_READY_LABEL,
            Self::Busy => SUBMIT_BUSY_LABEL,
        }
    }

    #[must_use]
    pub fn is_disabled(self) -> bool {
        matches!(self, Self::Busy)
    }
}

/// Whatever displays the widget: a DOM, an HTML document, a test recorder.
pub trait RenderingSurface {
    /// Replace the list region. An empty slice shows [`EMPTY_LIST_MESSAGE`].
    fn render_list(&mut self, recommendations: &[Recommendation]);

    /// Substitute glyphs for every icon placeholder currently on the surface.
    fn render_icons(&mut self);

    fn show_feedback(&mut self, message: &str);

    /// Start fading the feedback dialog out; it detaches once the fade elapses.
    fn hide_feedback(&mut self, now: Instant);

    fn set_submit_control(&mut self, control: SubmitControl);

    fn clear_form(&mut self);

    /// Advance time-based transitions.
    fn tick(&mut self, _now: Instant) {}
}
