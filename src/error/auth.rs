//! Authentication error types.

use std::fmt;

use super::network::NetworkError;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// Email or password was blank; nothing was sent.
    MissingCredentials,

    /// The auth service rejected the email/password pair.
    InvalidCredentials,

    /// An operation needed a session and there is none.
    NotAuthenticated,

    /// The access token expired and could not be refreshed.
    TokenExpired,

    /// The refresh token was rejected.
    RefreshTokenInvalid,

    /// A new password violates one or more policy rules.
    WeakPassword { violations: Vec<String> },

    /// The auth service answered with an unexpected status.
    ApiError { status: u16, message: String },

    /// Transport failure while talking to the auth service.
    Network(NetworkError),

    /// The persisted session could not be read or written.
    Storage { message: String },
}

impl AuthError {
    /// The user has to sign in again before anything else will work.
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated | AuthError::TokenExpired | AuthError::RefreshTokenInvalid
        )
    }

    /// A retry without user input might succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AuthError::Network(err) => err.is_retryable(),
            AuthError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AuthError::MissingCredentials => "Please fill in both email and password.".to_string(),
            AuthError::InvalidCredentials => "Invalid email or password.".to_string(),
            AuthError::NotAuthenticated => "You need to sign in first.".to_string(),
            AuthError::TokenExpired => "Your session has expired. Please sign in again.".to_string(),
            AuthError::RefreshTokenInvalid => {
                "Your session is no longer valid. Please sign in again.".to_string()
            }
            AuthError::WeakPassword { violations } => {
                format!("Password is too weak: {}.", violations.join("; "))
            }
            AuthError::ApiError { message, .. } => format!("Authentication failed: {}", message),
            AuthError::Network(err) => err.user_message(),
            AuthError::Storage { .. } => "Could not access the saved session.".to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "E_AUTH_MISSING",
            AuthError::InvalidCredentials => "E_AUTH_INVALID",
            AuthError::NotAuthenticated => "E_AUTH_NONE",
            AuthError::TokenExpired => "E_AUTH_EXPIRED",
            AuthError::RefreshTokenInvalid => "E_AUTH_REFRESH",
            AuthError::WeakPassword { .. } => "E_AUTH_WEAK",
            AuthError::ApiError { .. } => "E_AUTH_API",
            AuthError::Network(_) => "E_AUTH_NET",
            AuthError::Storage { .. } => "E_AUTH_STORE",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Email and password are required"),
            AuthError::InvalidCredentials => write!(f, "Invalid login credentials"),
            AuthError::NotAuthenticated => write!(f, "Not authenticated"),
            AuthError::TokenExpired => write!(f, "Access token expired"),
            AuthError::RefreshTokenInvalid => write!(f, "Refresh token invalid"),
            AuthError::WeakPassword { violations } => {
                write!(f, "Weak password ({} rule(s) violated)", violations.len())
            }
            AuthError::ApiError { status, message } => {
                write!(f, "Auth API error ({}): {}", status, message)
            }
            AuthError::Network(err) => write!(f, "Auth request failed: {}", err),
            AuthError::Storage { message } => write!(f, "Session storage error: {}", message),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NetworkError> for AuthError {
    fn from(err: NetworkError) -> Self {
        AuthError::Network(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_reauth() {
        assert!(AuthError::NotAuthenticated.requires_reauth());
        assert!(AuthError::RefreshTokenInvalid.requires_reauth());
        assert!(!AuthError::InvalidCredentials.requires_reauth());
        assert!(!AuthError::MissingCredentials.requires_reauth());
    }

    #[test]
    fn test_recoverable_only_for_transient_failures() {
        assert!(AuthError::ApiError {
            status: 503,
            message: "down".to_string()
        }
        .is_recoverable());
        assert!(!AuthError::ApiError {
            status: 400,
            message: "bad".to_string()
        }
        .is_recoverable());
        assert!(!AuthError::Network(NetworkError::Cancelled).is_recoverable());
    }

    #[test]
    fn test_weak_password_lists_every_rule() {
        let err = AuthError::WeakPassword {
            violations: vec!["too short".to_string(), "no digit".to_string()],
        };
        assert_eq!(err.user_message(), "Password is too weak: too short; no digit.");
        assert_eq!(err.to_string(), "Weak password (2 rule(s) violated)");
    }
}
