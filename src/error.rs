//! Typed classification of remote-service failures.
//!
//! Every remote call returns `Result<T, ApiError>` so callers always handle
//! both paths explicitly. Classification follows the service's response
//! shape: non-2xx responses carry a `detail` field that is either a plain
//! message or a list of field-level validation entries.

use reqwest::StatusCode;
use thiserror::Error;

/// Classified failure of a remote-service call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Field-level validation messages from the service, rendered joined
    /// by commas.
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    /// No response was received. The detail is kept for diagnostics; the
    /// user-facing message stays generic.
    #[error("Something went wrong. Please check your connection.")]
    Network(String),

    /// Request rejected for missing or expired credentials. Surfaced so the
    /// caller can trigger re-authentication; never retried locally.
    #[error("Authentication required: {0}")]
    Auth(String),

    /// The target no longer exists on the service.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Fallback for anything else; always carries the raw failure detail.
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl ApiError {
    /// Classify a non-2xx HTTP response from the service.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").cloned());

        match status.as_u16() {
            401 | 403 => ApiError::Auth(detail_text(&detail, body)),
            404 => ApiError::NotFound(detail_text(&detail, body)),
            400 | 422 => ApiError::Validation(detail_messages(&detail, body)),
            _ => ApiError::Unknown(format!("{}: {}", status, detail_text(&detail, body))),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            ApiError::Network(err.to_string())
        } else {
            ApiError::Unknown(err.to_string())
        }
    }
}

/// Render a `detail` value as one message, falling back to the raw body.
fn detail_text(detail: &Option<serde_json::Value>, body: &str) -> String {
    match detail {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None if body.trim().is_empty() => "no response body".to_string(),
        None => body.trim().to_string(),
    }
}

/// Extract the per-field messages of a validation `detail` list.
fn detail_messages(detail: &Option<serde_json::Value>, body: &str) -> Vec<String> {
    match detail {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.get("msg")
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| item.to_string())
            })
            .collect(),
        _ => vec![detail_text(detail, body)],
    }
}
