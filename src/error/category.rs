//! Error category classification.
//!
//! Categories drive the few decisions the cache layer leaves to callers:
//! whether offering a manual retry makes sense, and which hint to show.

use std::fmt;

/// High-level classification of a [`MarketError`](super::MarketError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, DNS or timeout problems.
    Network,

    /// Session missing, expired or rejected.
    Auth,

    /// The backend answered with a 5xx or an unusable body.
    Server,

    /// The request itself was wrong (bad filter, constraint violation,
    /// unexpected row count).
    Client,

    /// The user must change their input (weak password, blank email).
    User,

    /// Local filesystem or environment problems.
    System,

    /// Missing or invalid configuration.
    Configuration,
}

impl ErrorCategory {
    /// Whether a manual retry of the same operation can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::User => "user",
            ErrorCategory::System => "system",
            ErrorCategory::Configuration => "configuration",
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check your connection and try again",
            ErrorCategory::Auth => "Sign in again",
            ErrorCategory::Server => "Something went wrong on our side. Try again in a moment",
            ErrorCategory::Client => "Please report this issue if it keeps happening",
            ErrorCategory::User => "Check your input and try again",
            ErrorCategory::System => "Check file permissions and available disk space",
            ErrorCategory::Configuration => "Check BAZAAR_URL and BAZAAR_ANON_KEY",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
