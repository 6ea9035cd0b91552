//! Error types for the console.

use thiserror::Error;

/// Fallback text shown when the backend gives no usable error message.
pub const GENERIC_FAILURE: &str = "An error occurred";

/// Console error type.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// HTTP transport failed (connection refused, timeout, bad body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered with an error payload.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response.
        message: String,
    },
}

impl ConsoleError {
    /// Text suitable for a toast or an inline error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Api { .. } => GENERIC_FAILURE.to_string(),
            Self::Http(_) => "Unable to reach the fabric backend".to_string(),
            Self::InvalidUrl(_) => "The fabric backend URL is invalid".to_string(),
            Self::Json(_) => "The fabric backend sent an unreadable response".to_string(),
        }
    }
}

/// Malformed or partial data passed to a renderer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("workflow has no steps")]
    EmptyWorkflow,

    #[error("pipeline reports {completed} of {total} steps completed but lists {listed}")]
    InconsistentPipeline {
        completed: u32,
        total: u32,
        listed: usize,
    },

    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// Result type alias for console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Pull a user-facing message out of an error response body.
///
/// Prefers `message`, then `error`, then the raw status line.
#[must_use]
pub fn extract_error_message(status: reqwest::StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(ToString::to_string)
    };

    field("message").or_else(|| field("error")).unwrap_or_else(|| {
        format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )
    })
}
