//! Eventide error types and HTTP status classification.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Eventide error types.
///
/// Every failure a coordinator can observe is reduced to one of these
/// variants, and every variant maps to exactly one [`ErrorCode`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventideError {
    // Transport errors
    #[error("network error: {0}")]
    Network(String),

    // Status-derived errors
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("HTTP error ({status}): {message}")]
    Http { status: u16, message: String },

    /// The operation was superseded or aborted. Never surfaced to consumers.
    #[error("request cancelled")]
    Cancelled,

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for EventideError {
    fn from(err: serde_json::Error) -> Self {
        EventideError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for EventideError {
    fn from(err: reqwest::Error) -> Self {
        // Status errors are classified separately; anything reaching this
        // conversion happened below the HTTP layer (connect, timeout, decode).
        EventideError::Network(err.to_string())
    }
}

impl EventideError {
    /// The stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EventideError::Network(_) | EventideError::Json(_) => ErrorCode::NetworkError,
            EventideError::InvalidParams(_) => ErrorCode::InvalidParams,
            EventideError::Unauthorized(_) => ErrorCode::Unauthorized,
            EventideError::NotFound(_) => ErrorCode::NotFound,
            EventideError::RateLimited { .. } => ErrorCode::RateLimited,
            EventideError::Server { .. } => ErrorCode::ServerError,
            EventideError::Http { status, .. } => ErrorCode::Http(*status),
            EventideError::Cancelled => ErrorCode::Cancelled,
            EventideError::Configuration(_) => ErrorCode::Configuration,
        }
    }

    /// Whether a later attempt with the same input could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EventideError::Network(_)
                | EventideError::RateLimited { .. }
                | EventideError::Server { .. }
        )
    }

    /// Whether this error marks a superseded operation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EventideError::Cancelled)
    }

    /// The `Retry-After` hint of a rate-limit error, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            EventideError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Stable, consumer-facing classification of an [`EventideError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NetworkError,
    InvalidParams,
    Unauthorized,
    NotFound,
    RateLimited,
    ServerError,
    /// Fallback for any other non-2xx status.
    Http(u16),
    Cancelled,
    Configuration,
}

impl ErrorCode {
    /// Wire-style name, e.g. `"NETWORK_ERROR"`.
    ///
    /// The status-keyed fallback renders as `"HTTP_<status>"`.
    pub fn as_str(&self) -> std::borrow::Cow<'static, str> {
        match self {
            ErrorCode::NetworkError => "NETWORK_ERROR".into(),
            ErrorCode::InvalidParams => "INVALID_PARAMS".into(),
            ErrorCode::Unauthorized => "UNAUTHORIZED".into(),
            ErrorCode::NotFound => "NOT_FOUND".into(),
            ErrorCode::RateLimited => "RATE_LIMITED".into(),
            ErrorCode::ServerError => "SERVER_ERROR".into(),
            ErrorCode::Http(status) => format!("HTTP_{status}").into(),
            ErrorCode::Cancelled => "CANCELLED".into(),
            ErrorCode::Configuration => "CONFIGURATION".into(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Error body returned by the backend on the read path.
///
/// Both fields are optional and the body itself may be missing or malformed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl ErrorBody {
    /// Parse an error body, returning `None` for empty or malformed input.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    fn message(&self) -> Option<String> {
        match (&self.error, &self.details) {
            (Some(error), Some(details)) => Some(format!("{error}: {details}")),
            (Some(error), None) => Some(error.clone()),
            (None, Some(details)) => Some(details.clone()),
            (None, None) => None,
        }
    }
}

/// Map a non-2xx status (plus an optional parsed body) to an error.
///
/// The body only contributes the message. The variant is decided by the
/// status alone, so a missing or unparsable body never changes the outcome.
pub fn classify_status(
    status: u16,
    body: Option<&ErrorBody>,
    retry_after: Option<Duration>,
) -> EventideError {
    let message = body
        .and_then(ErrorBody::message)
        .unwrap_or_else(|| default_message(status).to_string());

    match status {
        400 => EventideError::InvalidParams(message),
        401 | 403 => EventideError::Unauthorized(message),
        404 => EventideError::NotFound(message),
        429 => EventideError::RateLimited { retry_after },
        s if s >= 500 => EventideError::Server { status, message },
        _ => EventideError::Http { status, message },
    }
}

fn default_message(status: u16) -> &'static str {
    match status {
        400 => "invalid request parameters",
        401 | 403 => "not authorized",
        404 => "resource not found",
        429 => "too many requests",
        s if s >= 500 => "server error",
        _ => "request failed",
    }
}

/// Result type alias for Eventide operations.
pub type Result<T> = std::result::Result<T, EventideError>;
