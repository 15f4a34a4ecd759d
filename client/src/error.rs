//! Error types for the Ticketr API client

use thiserror::Error;

/// Errors that can occur when talking to the Ticketr backend.
///
/// The `Display` output is meant to be shown to the user as-is. `Clone` so the
/// error can ride inside workflow actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Transport failure: connection refused, timeout, TLS, ...
    #[error("Network error: {0}")]
    RequestFailed(String),

    /// Backend answered with a non-2xx status.
    ///
    /// `message` is the backend's `error`/`message` field when it sent one,
    /// otherwise a generic description of the status.
    #[error("{message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Human-readable message
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("Unexpected response from server: {0}")]
    ResponseParseFailed(String),

    /// Client could not be built from the given settings
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// HTTP status, if the backend answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build an [`ApiError::Api`] from a status and raw response body.
    ///
    /// Flask handlers answer errors with `{"error": "..."}`; some success-ish
    /// handlers use `{"message": "..."}`. Anything else gets a generic message.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                ["error", "message"].iter().find_map(|key| {
                    value
                        .get(key)
                        .and_then(serde_json::Value::as_str)
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string)
                })
            })
            .unwrap_or_else(|| format!("Request failed with status {status}"));

        Self::Api { status, message }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::ResponseParseFailed(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}
