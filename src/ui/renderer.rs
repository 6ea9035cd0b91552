//! Chat message rendering.

use std::fmt::Write as _;

use crate::error::RenderError;
use crate::html;
use crate::model::{ChatMessage, MessageStatus, Role, StepResult, StepStatus};
use crate::ui::workflow::WorkflowPanel;

/// A rendered message: its list key and HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub key: String,
    pub html: String,
}

/// Convert the supported markdown subset to HTML.
///
/// The input is escaped first, then `**bold**` becomes `<strong>`, list
/// markers (`- `, `* `, `• `) become bullets and newlines become `<br>`.
///
/// ```rust
/// use fabric_console::ui::renderer::format_response;
///
/// assert_eq!(
///     format_response("**bold** text\nline2"),
///     "<strong>bold</strong> text<br>line2"
/// );
/// ```
#[must_use]
pub fn format_response(text: &str) -> String {
    text.lines()
        .map(|line| {
            let escaped = html::escape(line);
            let trimmed = escaped.trim_start();
            ["- ", "* ", "• "]
                .iter()
                .find_map(|marker| trimmed.strip_prefix(marker))
                .map_or_else(|| embolden(&escaped), |item| format!("• {}", embolden(item)))
        })
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Replace `**x**` pairs with `<strong>x</strong>`. An unpaired `**` is
/// kept literally.
fn embolden(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str("<strong>");
        out.push_str(&after[..end]);
        out.push_str("</strong>");
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// Short description of the data a step produced.
#[must_use]
pub fn data_preview(data: Option<&serde_json::Value>) -> String {
    match data {
        Some(serde_json::Value::Array(items)) => format!("Generated {} items", items.len()),
        Some(serde_json::Value::Object(fields)) if !fields.is_empty() => {
            let keys: Vec<&str> = fields.keys().take(3).map(String::as_str).collect();
            let more = if fields.len() > 3 { "..." } else { "" };
            format!("Generated data: {}{more}", keys.join(", "))
        }
        Some(serde_json::Value::String(text)) => {
            format!("Generated text ({} characters)", text.chars().count())
        }
        _ => "Generated data".to_string(),
    }
}

/// Turns [`ChatMessage`]s into message bubbles.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageRenderer;

impl MessageRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Render a message, with pipeline and step details when present.
    #[must_use]
    pub fn render(&self, message: &ChatMessage) -> Rendered {
        let (role, align, bubble) = match message.role {
            Role::User => ("user", "justify-end", "bg-primary text-white"),
            Role::Assistant => ("assistant", "justify-start", "bg-surfaceVariant"),
        };

        let mut body = format_response(&message.content);

        if let Some(info) = &message.pipeline_info {
            if WorkflowPanel::wants_summary(info) {
                body.push_str(&WorkflowPanel::pipeline_summary(info));
            }
        }

        if !message.step_results.is_empty() {
            body.push_str(&step_breakdown(message.step_results.iter()));
        }

        if let Some(status) = message.status.filter(|s| *s != MessageStatus::Success) {
            let _ = write!(
                body,
                r#"<div class="message-status status-{status}" role="alert">{label}</div>"#,
                status = status.as_str(),
                label = match status {
                    MessageStatus::Error => "Request failed",
                    _ => "Processing...",
                },
            );
        }

        let html = format!(
            r#"<div id="{id}" class="message message-{role} flex {align}" data-timestamp="{timestamp}">
    <div class="message-bubble rounded-2xl px-4 py-3 max-w-[80%] {bubble}">
        <div class="message-content">{body}</div>
        <time class="message-time text-xs opacity-70">{time}</time>
    </div>
</div>"#,
            id = html::escape(&message.id),
            timestamp = message.timestamp.to_rfc3339(),
            time = message.timestamp.format("%H:%M"),
        );

        Rendered {
            key: message.id.clone(),
            html,
        }
    }

    /// Render an untyped payload, falling back to an error stub when it is
    /// not a valid message.
    #[must_use]
    pub fn render_value(&self, value: &serde_json::Value) -> Rendered {
        match serde_json::from_value::<ChatMessage>(value.clone()) {
            Ok(message) => self.render(&message),
            Err(err) => {
                let err = RenderError::MalformedMessage(err.to_string());
                tracing::warn!(error = %err, "Rendering fallback message");
                let key = value
                    .get("id")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(
                        || format!("invalid_{}", uuid::Uuid::new_v4().simple()),
                        ToString::to_string,
                    );
                Rendered {
                    html: error_stub(&key),
                    key,
                }
            }
        }
    }
}

fn error_stub(key: &str) -> String {
    format!(
        r#"<div id="{key}" class="message message-error flex justify-start"><div class="message-bubble rounded-2xl px-4 py-3 bg-danger/10 text-danger">This message could not be displayed.</div></div>"#,
        key = html::escape(key),
    )
}

fn step_breakdown<'a>(results: impl Iterator<Item = (&'a String, &'a StepResult)>) -> String {
    let mut items = String::new();
    let mut count = 0;
    for (name, result) in results {
        count += 1;
        let (icon, class) = match result.status {
            StepStatus::Success => ("✓", "step-success"),
            StepStatus::Error => ("✗", "step-error"),
            StepStatus::Unknown => ("•", "step-unknown"),
        };
        let detail = match (&result.status, &result.error) {
            (StepStatus::Error, Some(error)) => html::escape(error),
            _ => data_preview(result.data.as_ref()),
        };
        let _ = write!(
            items,
            r#"<li class="step-result {class}"><span class="step-icon">{icon}</span> <strong>{name}</strong> <span class="step-preview">{detail}</span></li>"#,
            name = html::escape(name),
        );
    }

    format!(
        r#"<details class="step-results mt-3"><summary>Step details ({count})</summary><ul>{items}</ul></details>"#
    )
}
