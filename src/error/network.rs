//! Transport-level error types.
//!
//! A `NetworkError` means the request never produced a usable HTTP
//! exchange: the connection failed, timed out or was cancelled. Non-2xx
//! responses that did arrive are [`BackendError`](super::BackendError)s.

use std::fmt;

use crate::traits::HttpError;

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Connection to the backend failed.
    ConnectionFailed { url: String, message: String },

    /// Request did not complete in time.
    Timeout { operation: String, duration_secs: u64 },

    /// Rate limited by the backend.
    RateLimited { retry_after_secs: Option<u64> },

    /// Request was cancelled before completion.
    Cancelled,

    /// The URL could not be built.
    InvalidUrl { url: String },

    /// Anything else reported by the HTTP stack.
    Other { message: String },
}

impl NetworkError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionFailed { .. }
                | NetworkError::Timeout { .. }
                | NetworkError::RateLimited { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            NetworkError::ConnectionFailed { .. } => {
                "Unable to reach the marketplace. Please check your internet connection.".to_string()
            }
            NetworkError::Timeout { duration_secs, .. } => {
                format!("The request timed out after {} seconds.", duration_secs)
            }
            NetworkError::RateLimited { retry_after_secs: Some(secs) } => {
                format!("Too many requests. Please wait {} seconds.", secs)
            }
            NetworkError::RateLimited { retry_after_secs: None } => {
                "Too many requests. Please wait a moment.".to_string()
            }
            NetworkError::Cancelled => "The request was cancelled.".to_string(),
            NetworkError::InvalidUrl { .. } => "The backend address is invalid.".to_string(),
            NetworkError::Other { message } => format!("Network error: {}", message),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed { .. } => "E_NET_CONN",
            NetworkError::Timeout { .. } => "E_NET_TIMEOUT",
            NetworkError::RateLimited { .. } => "E_NET_RATE",
            NetworkError::Cancelled => "E_NET_CANCEL",
            NetworkError::InvalidUrl { .. } => "E_NET_URL",
            NetworkError::Other { .. } => "E_NET_OTHER",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed { url, message } => {
                write!(f, "Connection failed to '{}': {}", url, message)
            }
            NetworkError::Timeout { operation, duration_secs } => {
                write!(f, "{} timed out after {} seconds", operation, duration_secs)
            }
            NetworkError::RateLimited { retry_after_secs: Some(secs) } => {
                write!(f, "Rate limited, retry after {} seconds", secs)
            }
            NetworkError::RateLimited { retry_after_secs: None } => write!(f, "Rate limited"),
            NetworkError::Cancelled => write!(f, "Request cancelled"),
            NetworkError::InvalidUrl { url } => write!(f, "Invalid URL: {}", url),
            NetworkError::Other { message } => write!(f, "Network error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Convert a transport failure reported by an [`HttpClient`](crate::traits::HttpClient).
///
/// `ServerError` never reaches here: the REST adapters read status codes
/// themselves and build [`BackendError`](super::BackendError)s.
pub fn classify_http_error(err: HttpError, url: &str) -> NetworkError {
    match err {
        HttpError::ConnectionFailed(message) => NetworkError::ConnectionFailed {
            url: url.to_string(),
            message,
        },
        HttpError::Timeout(_) => NetworkError::Timeout {
            operation: "HTTP request".to_string(),
            duration_secs: 0,
        },
        HttpError::Cancelled => NetworkError::Cancelled,
        HttpError::InvalidUrl(url) => NetworkError::InvalidUrl { url },
        HttpError::ServerError { status: 429, .. } => NetworkError::RateLimited {
            retry_after_secs: None,
        },
        HttpError::ServerError { status, message } => NetworkError::Other {
            message: format!("HTTP {}: {}", status, message),
        },
        HttpError::Io(message) | HttpError::Other(message) => NetworkError::Other { message },
    }
}
