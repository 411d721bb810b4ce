//! Icon placeholder substitution.
//!
//! Markup carries inert `<i data-lucide="NAME" class="..."></i>` placeholders;
//! an [`IconLibrary`] pass swaps each known one for an inline SVG glyph.

use tracing::debug;

const PLACEHOLDER_OPEN: &str = "<i data-lucide=\"";
const PLACEHOLDER_CLOSE: &str = "</i>";

pub trait IconLibrary {
    /// Return `markup` with every recognised placeholder replaced.
    fn create_icons(&self, markup: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LucideIcons;

impl LucideIcons {
    fn glyph(name: &str) -> Option<&'static str> {
        match name {
            "user" => Some(
                r#"<path d="M19 21v-2a4 4 0 0 0-4-4H9a4 4 0 0 0-4 4v2"/><circle cx="12" cy="7" r="4"/>"#,
            ),
            "send" => Some(
                r#"<path d="m22 2-7 20-4-9-9-4Z"/><path d="M22 2 11 13"/>"#,
            ),
            "check-circle" => Some(
                r#"<path d="M22 11.08V12a10 10 0 1 1-5.93-9.14"/><path d="m9 11 3 3L22 4"/>"#,
            ),
            "x" => Some(r#"<path d="M18 6 6 18"/><path d="m6 6 12 12"/>"#),
            _ => None,
        }
    }

    fn render(placeholder: &Placeholder<'_>) -> Option<String> {
        let body = Self::glyph(placeholder.name)?;
        let class = match placeholder.class {
            Some(extra) if !extra.is_empty() => format!("lucide lucide-{} {extra}", placeholder.name),
            _ => format!("lucide lucide-{}", placeholder.name),
        };
        Some(format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" class="{class}" data-lucide="{}">{body}</svg>"#,
            placeholder.name
        ))
    }
}

impl IconLibrary for LucideIcons {
    fn create_icons(&self, markup: &str) -> String {
        let mut output = String::with_capacity(markup.len());
        let mut rest = markup;

        while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
            output.push_str(&rest[..start]);
            let tail = &rest[start..];
            let Some(end) = tail.find(PLACEHOLDER_CLOSE) else {
                rest = tail;
                break;
            };
            let element_end = end + PLACEHOLDER_CLOSE.len();
            let element = &tail[..element_end];

            match Placeholder::parse(element).and_then(|placeholder| Self::render(&placeholder)) {
                Some(svg) => output.push_str(&svg),
                None => {
                    debug!(element, "leaving unknown icon placeholder inert");
                    output.push_str(element);
                }
            }
            rest = &tail[element_end..];
        }

        output.push_str(rest);
        output
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Placeholder<'a> {
    name: &'a str,
    class: Option<&'a str>,
}

impl<'a> Placeholder<'a> {
    fn parse(element: &'a str) -> Option<Self> {
        let after_open = element.strip_prefix(PLACEHOLDER_OPEN)?;
        let name_end = after_open.find('"')?;
        let name = &after_open[..name_end];
        if name.is_empty() {
            return None;
        }
        let class = after_open.find("class=\"").and_then(|class_start| {
            let value = &after_open[class_start + "class=\"".len()..];
            value.find('"').map(|class_end| &value[..class_end])
        });
        Some(Self { name, class })
    }
}
