//! The recommendation widget: repository, rendering surface, feedback
//! dialog and the submit workflow that ties them together.

pub mod dialog;
pub mod html;
pub mod icons;
pub mod repository;
pub mod surface;
pub mod widget;
pub mod workflow;

pub use dialog::{DialogPhase, FeedbackDialog, DEFAULT_FEEDBACK_MESSAGE, FADE_OUT};
pub use html::{escape_html, HtmlSurface};
pub use icons::{IconLibrary, LucideIcons};
pub use repository::{Clock, RecommendationRepository, SubmitError};
pub use surface::{RenderingSurface, SubmitControl, EMPTY_LIST_MESSAGE};
pub use widget::Widget;
pub use workflow::{
    apply_effects, Effect, FormInput, Submission, SubmissionOutcome, SubmissionWorkflow,
    WorkflowState, SUCCESS_FEEDBACK, VALIDATION_FEEDBACK,
};
