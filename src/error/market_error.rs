//! The crate-wide error type.

use std::fmt;

use super::auth::AuthError;
use super::backend::BackendError;
use super::category::ErrorCategory;
use super::context::ErrorContext;
use super::network::NetworkError;
use super::query::QueryError;
use super::system::SystemError;

/// Every error the crate can hand to an application, plus an optional
/// [`ErrorContext`].
#[derive(Debug)]
pub enum MarketError {
    Network(NetworkError),
    Backend(BackendError),
    Auth(AuthError),
    Query(QueryError),
    System(SystemError),

    WithContext {
        error: Box<MarketError>,
        context: ErrorContext,
    },
}

impl MarketError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MarketError::Network(_) => ErrorCategory::Network,
            MarketError::Backend(err) => backend_category(err),
            MarketError::Auth(err) => match err {
                AuthError::Network(_) => ErrorCategory::Network,
                AuthError::Storage { .. } => ErrorCategory::System,
                AuthError::ApiError { status, .. } if *status >= 500 => ErrorCategory::Server,
                err if err.requires_reauth() => ErrorCategory::Auth,
                _ => ErrorCategory::User,
            },
            MarketError::Query(err) => match err {
                QueryError::Backend(err) => backend_category(err),
                QueryError::Timeout(_) => ErrorCategory::Network,
                QueryError::Unauthenticated => ErrorCategory::Auth,
                _ => ErrorCategory::Client,
            },
            MarketError::System(SystemError::EnvironmentError { .. }) => {
                ErrorCategory::Configuration
            }
            MarketError::System(_) => ErrorCategory::System,
            MarketError::WithContext { error, .. } => error.category(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            MarketError::Network(err) => err.is_retryable(),
            MarketError::Backend(err) => err.is_retryable(),
            MarketError::Auth(err) => err.is_recoverable(),
            MarketError::Query(err) => err.is_retryable(),
            MarketError::System(err) => err.is_transient(),
            MarketError::WithContext { error, .. } => error.is_retryable(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            MarketError::Network(err) => err.user_message(),
            MarketError::Backend(err) => err.user_message(),
            MarketError::Auth(err) => err.user_message(),
            MarketError::Query(err) => err.user_message(),
            MarketError::System(err) => err.user_message(),
            MarketError::WithContext { error, .. } => error.user_message(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            MarketError::Network(err) => err.error_code(),
            MarketError::Backend(err) => err.error_code(),
            MarketError::Auth(err) => err.error_code(),
            MarketError::Query(err) => err.error_code(),
            MarketError::System(err) => err.error_code(),
            MarketError::WithContext { error, .. } => error.error_code(),
        }
    }

    pub fn with_context(self, ctx: ErrorContext) -> Self {
        MarketError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            MarketError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The error with every context layer peeled off.
    pub fn inner(&self) -> &MarketError {
        match self {
            MarketError::WithContext { error, .. } => error.inner(),
            _ => self,
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }

    pub fn requires_reauth(&self) -> bool {
        match self {
            MarketError::Auth(err) => err.requires_reauth(),
            MarketError::Backend(BackendError::Api { status: 401, .. }) => true,
            MarketError::Query(QueryError::Unauthenticated) => true,
            MarketError::Query(QueryError::Backend(BackendError::Api { status: 401, .. })) => true,
            MarketError::WithContext { error, .. } => error.requires_reauth(),
            _ => false,
        }
    }
}

fn backend_category(err: &BackendError) -> ErrorCategory {
    match err {
        BackendError::Network(_) => ErrorCategory::Network,
        BackendError::Api { status: 401, .. } | BackendError::Api { status: 403, .. } => {
            ErrorCategory::Auth
        }
        err if err.is_server_side() => ErrorCategory::Server,
        _ => ErrorCategory::Client,
    }
}

impl fmt::Display for MarketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketError::Network(err) => write!(f, "{}", err),
            MarketError::Backend(err) => write!(f, "{}", err),
            MarketError::Auth(err) => write!(f, "{}", err),
            MarketError::Query(err) => write!(f, "{}", err),
            MarketError::System(err) => write!(f, "{}", err),
            MarketError::WithContext { error, context } => write!(f, "{} ({})", error, context),
        }
    }
}

impl std::error::Error for MarketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MarketError::Network(err) => Some(err),
            MarketError::Backend(err) => Some(err),
            MarketError::Auth(err) => Some(err),
            MarketError::Query(err) => Some(err),
            MarketError::System(err) => Some(err),
            MarketError::WithContext { error, .. } => error.source(),
        }
    }
}

impl From<NetworkError> for MarketError {
    fn from(err: NetworkError) -> Self {
        MarketError::Network(err)
    }
}

impl From<BackendError> for MarketError {
    fn from(err: BackendError) -> Self {
        MarketError::Backend(err)
    }
}

impl From<AuthError> for MarketError {
    fn from(err: AuthError) -> Self {
        MarketError::Auth(err)
    }
}

impl From<QueryError> for MarketError {
    fn from(err: QueryError) -> Self {
        MarketError::Query(err)
    }
}

impl From<SystemError> for MarketError {
    fn from(err: SystemError) -> Self {
        MarketError::System(err)
    }
}

impl From<std::io::Error> for MarketError {
    fn from(err: std::io::Error) -> Self {
        MarketError::System(SystemError::IoError {
            operation: "io".to_string(),
            path: None,
            message: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::Backend(BackendError::from(err))
    }
}
