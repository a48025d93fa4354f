use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a usable response: connection failure,
    /// timeout, or an unparseable body.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered but reported a logical failure
    /// (bad credentials, unknown resource, internal error).
    #[error("{message}")]
    Application { status: u16, message: String },

    /// The operation requires an authenticated session and there is none.
    /// This is an expected steady state, not a fault.
    #[error("not authenticated")]
    AuthRequired,
}

/// Maximum length for raw error response bodies carried in messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Structured error body the backend sends for logical failures
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// Truncate a response body to avoid dragging huge payloads into logs
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Build an application error from a non-success status and its body.
    /// Prefers the structured `{"error": ...}` body; falls back to the raw
    /// (truncated) text, then to the status line alone.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) if !parsed.error.is_empty() => parsed.error,
            _ if !body.trim().is_empty() => Self::truncate_body(body.trim()),
            _ => format!("request failed with status {}", status),
        };
        ApiError::Application {
            status: status.as_u16(),
            message,
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, ApiError::AuthRequired)
    }
}
