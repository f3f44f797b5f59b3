//! Errors reported by the data backend (REST tables and object storage).

use std::fmt;

use super::network::NetworkError;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The request never completed.
    Network(NetworkError),

    /// The backend answered with a non-2xx status.
    ///
    /// `code` is the backend's own error code when the body carried one
    /// (a Postgres SQLSTATE or a PostgREST `PGRST…` code).
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A 2xx body that could not be decoded into the expected rows.
    Decode { message: String },

    /// Object storage rejected an upload or download.
    Storage { bucket: String, message: String },

    /// Refused before sending, e.g. an unfiltered update or delete.
    InvalidRequest { message: String },
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(err) => err.is_retryable(),
            BackendError::Api { status, .. } => *status >= 500 || *status == 429,
            BackendError::Decode { .. }
            | BackendError::Storage { .. }
            | BackendError::InvalidRequest { .. } => false,
        }
    }

    /// 5xx and undecodable bodies are the server's fault.
    pub fn is_server_side(&self) -> bool {
        match self {
            BackendError::Api { status, .. } => *status >= 500,
            BackendError::Decode { .. } => true,
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            BackendError::Network(err) => err.user_message(),
            BackendError::Api { status: 401, .. } | BackendError::Api { status: 403, .. } => {
                "You are not allowed to do that. Try signing in again.".to_string()
            }
            BackendError::Api { status, message, .. } if *status >= 500 => {
                format!("The marketplace is having trouble ({}). {}", status, message)
            }
            BackendError::Api { message, .. } => message.clone(),
            BackendError::Decode { .. } => "Received an unexpected response.".to_string(),
            BackendError::Storage { message, .. } => format!("File transfer failed: {}", message),
            BackendError::InvalidRequest { message } => message.clone(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BackendError::Network(err) => err.error_code(),
            BackendError::Api { status, .. } if *status >= 500 => "E_BACKEND_5XX",
            BackendError::Api { .. } => "E_BACKEND_4XX",
            BackendError::Decode { .. } => "E_BACKEND_DECODE",
            BackendError::Storage { .. } => "E_BACKEND_STORAGE",
            BackendError::InvalidRequest { .. } => "E_BACKEND_REQUEST",
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Network(err) => write!(f, "{}", err),
            BackendError::Api {
                status,
                code: Some(code),
                message,
            } => write!(f, "Backend error {} ({}): {}", status, code, message),
            BackendError::Api {
                status,
                code: None,
                message,
            } => write!(f, "Backend error {}: {}", status, message),
            BackendError::Decode { message } => write!(f, "Malformed backend response: {}", message),
            BackendError::Storage { bucket, message } => {
                write!(f, "Storage error in '{}': {}", bucket, message)
            }
            BackendError::InvalidRequest { message } => write!(f, "Invalid request: {}", message),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NetworkError> for BackendError {
    fn from(err: NetworkError) -> Self {
        BackendError::Network(err)
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> BackendError {
        BackendError::Api {
            status,
            code: None,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_retryable_by_status() {
        assert!(api(500).is_retryable());
        assert!(api(429).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(409).is_retryable());
    }

    #[test]
    fn test_display_includes_code_when_present() {
        let err = BackendError::Api {
            status: 406,
            code: Some("PGRST116".to_string()),
            message: "JSON object requested, multiple (or no) rows returned".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Backend error 406 (PGRST116): JSON object requested, multiple (or no) rows returned"
        );
        assert_eq!(err.status(), Some(406));
    }

    #[test]
    fn test_decode_from_serde() {
        let serde_err = serde_json::from_str::<Vec<i64>>("{").unwrap_err();
        let err: BackendError = serde_err.into();
        assert!(matches!(err, BackendError::Decode { .. }));
        assert!(err.is_server_side());
    }
}
