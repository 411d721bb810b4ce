use std::time::{Duration, Instant};

/// Length of the dialog's fade-out transition.
pub const FADE_OUT: Duration = Duration::from_millis(300);

pub const DEFAULT_FEEDBACK_MESSAGE: &str =
    "Thank you for your recommendation! It is saved locally on your browser.";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DialogPhase {
    Hidden,
    Visible,
    FadingOut { detach_at: Instant },
}

/// Confirmation dialog with a timed fade-out.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FeedbackDialog {
    phase: DialogPhase,
    message: String,
}

impl Default for FeedbackDialog {
    fn default() -> Self {
        Self { phase: DialogPhase::Hidden, message: DEFAULT_FEEDBACK_MESSAGE.to_string() }
    }
}

impl FeedbackDialog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show immediately. Cancels a pending detach from an earlier `hide`.
    pub fn show(&mut self, message: &str) {
        self.message = if message.is_empty() {
            DEFAULT_FEEDBACK_MESSAGE.to_string()
        } else {
            message.to_string()
        };
        self.phase = DialogPhase::Visible;
    }

    pub fn hide(&mut self, now: Instant) {
        if self.phase == DialogPhase::Visible {
            self.phase = DialogPhase::FadingOut { detach_at: now + FADE_OUT };
        }
    }

    /// Returns `true` when this call detached the dialog.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.phase {
            DialogPhase::FadingOut { detach_at } if now >= detach_at => {
                self.phase = DialogPhase::Hidden;
                self.message = DEFAULT_FEEDBACK_MESSAGE.to_string();
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> DialogPhase {
        self.phase
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attached to the page, including while fading out.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !matches!(self.phase, DialogPhase::Hidden)
    }

    #[must_use]
    pub fn css_classes(&self) -> &'static str {
        match self.phase {
            DialogPhase::Hidden => "hidden opacity-0",
            DialogPhase::Visible => "flex opacity-100",
            DialogPhase::FadingOut { .. } => "flex opacity-0",
        }
    }
}
