use std::fmt::Write as _;
use std::time::Instant;

use testimonial_core::Recommendation;
use tracing::debug;

use crate::dialog::FeedbackDialog;
use crate::icons::{IconLibrary, LucideIcons};
use crate::surface::{RenderingSurface, SubmitControl, EMPTY_LIST_MESSAGE};
use crate::workflow::FormInput;

/// An in-memory page: list region, form, submit button and feedback dialog.
#[derive(Debug, Clone)]
pub struct HtmlSurface<I = LucideIcons> {
    icons: I,
    list_html: String,
    submit: SubmitControl,
    submit_html: String,
    form: FormInput,
    dialog: FeedbackDialog,
    icon_passes: usize,
}

impl Default for HtmlSurface<LucideIcons> {
    fn default() -> Self {
        Self::new(LucideIcons)
    }
}

impl<I: IconLibrary> HtmlSurface<I> {
    pub fn new(icons: I) -> Self {
        Self {
            icons,
            list_html: String::new(),
            submit: SubmitControl::Ready,
            submit_html: SubmitControl::Ready.label().to_string(),
            form: FormInput::default(),
            dialog: FeedbackDialog::new(),
            icon_passes: 0,
        }
    }

    #[must_use]
    pub fn list_html(&self) -> &str {
        &self.list_html
    }

    #[must_use]
    pub fn submit_control(&self) -> SubmitControl {
        self.submit
    }

    #[must_use]
    pub fn submit_html(&self) -> &str {
        &self.submit_html
    }

    #[must_use]
    pub fn form(&self) -> &FormInput {
        &self.form
    }

    /// Simulate the visitor typing into the form.
    pub fn fill_form(&mut self, name: &str, recommendation_text: &str) {
        self.form = FormInput {
            name: name.to_string(),
            recommendation_text: recommendation_text.to_string(),
        };
    }

    #[must_use]
    pub fn dialog(&self) -> &FeedbackDialog {
        &self.dialog
    }

    #[must_use]
    pub fn icon_passes(&self) -> usize {
        self.icon_passes
    }

    /// The whole document as a standalone page.
    #[must_use]
    pub fn to_page_html(&self) -> String {
        let disabled = if self.submit.is_disabled() { " disabled" } else { "" };
        let mut page = String::new();
        page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        page.push_str("<meta charset=\"utf-8\">\n<title>Recommendations</title>\n</head>\n");
        page.push_str("<body class=\"bg-gray-900 text-gray-100\">\n<section id=\"recommendations\">\n");
        page.push_str("<h2>Recommendations</h2>\n");
        let _ = writeln!(
            page,
            "<div id=\"recommendationsList\" class=\"grid md:grid-cols-3 gap-8\">{}</div>",
            self.list_html
        );
        page.push_str("<form id=\"recommendationForm\">\n");
        let _ = writeln!(
            page,
            "<input id=\"name\" type=\"text\" required value=\"{}\">",
            escape_html(&self.form.name)
        );
        let _ = writeln!(
            page,
            "<textarea id=\"recommendationText\" required>{}</textarea>",
            escape_html(&self.form.recommendation_text)
        );
        let _ = writeln!(
            page,
            "<button id=\"submitButton\" type=\"submit\"{disabled}>{}</button>",
            self.submit_html
        );
        page.push_str("</form>\n</section>\n");
        let _ = writeln!(
            page,
            "<div id=\"confirmationDialog\" class=\"fixed inset-0 items-center justify-center transition-opacity duration-300 {}\">",
            self.dialog.css_classes()
        );
        let _ = writeln!(
            page,
            "<p id=\"dialogMessage\">{}</p>\n</div>",
            escape_html(self.dialog.message())
        );
        page.push_str("</body>\n</html>\n");
        page
    }
}

impl<I: IconLibrary> RenderingSurface for HtmlSurface<I> {
    fn render_list(&mut self, recommendations: &[Recommendation]) {
        if recommendations.is_empty() {
            self.list_html = format!(
                "<p class=\"col-span-3 text-center text-gray-500\">{EMPTY_LIST_MESSAGE}</p>"
            );
            return;
        }

        self.list_html = recommendations.iter().map(render_card).collect();
        debug!(cards = recommendations.len(), "recommendation list rendered");
    }

    fn render_icons(&mut self) {
        self.list_html = self.icons.create_icons(&self.list_html);
        self.submit_html = self.icons.create_icons(&self.submit_html);
        self.icon_passes += 1;
    }

    fn show_feedback(&mut self, message: &str) {
        self.dialog.show(message);
    }

    fn hide_feedback(&mut self, now: Instant) {
        self.dialog.hide(now);
    }

    fn set_submit_control(&mut self, control: SubmitControl) {
        self.submit = control;
        self.submit_html = control.label().to_string();
    }

    fn clear_form(&mut self) {
        self.form = FormInput::default();
    }

    fn tick(&mut self, now: Instant) {
        if self.dialog.tick(now) {
            debug!("feedback dialog detached");
        }
    }
}

fn render_card(record: &Recommendation) -> String {
    format!(
        r#"
<div class="bg-gray-800 p-6 rounded-xl shadow-xl border border-gray-700 animated-card" data-origin="{origin}">
    <p class="text-gray-300 italic mb-4">"{text}"</p>
    <div class="flex items-center text-sm font-medium text-green-400">
        <i data-lucide="user" class="w-4 h-4 mr-2"></i>
        &mdash; {name}
    </div>
</div>
"#,
        origin = record.origin,
        text = escape_html(&record.text),
        name = escape_html(&record.name),
    )
}

/// Escape text for element content and quoted attribute values.
#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
