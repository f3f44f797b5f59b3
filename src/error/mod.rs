//! Error handling for the marketplace client.
//!
//! - **Per-domain errors**: [`NetworkError`], [`BackendError`], [`AuthError`],
//!   [`QueryError`], [`SystemError`]
//! - **Unified error**: [`MarketError`] with category, retry and user-message helpers
//! - **Context**: [`ErrorContext`] attached through [`ResultExt`]
//!
//! Fetch and mutation state carry [`QueryError`] directly since it is
//! `Clone` and shared by every observer of a key. Commands wrap whatever
//! failed into a [`MarketResult`] with an [`ErrorContext`] naming the
//! operation, and report it by category.
//!
//! | Category | Typical source | Retryable |
//! |----------|----------------|-----------|
//! | Network | connection refused, timeout | Yes |
//! | Server | 5xx, malformed body | Yes |
//! | Auth | expired or missing session, 401 | No |
//! | Client | 4xx, unexpected row count | No |
//! | User | blank login form, weak password | No |
//! | System | session file I/O | Sometimes |
//! | Configuration | missing `BAZAAR_URL` | No |

mod auth;
mod backend;
mod category;
mod context;
mod market_error;
mod network;
mod query;
mod result;
mod system;

pub use auth::AuthError;
pub use backend::BackendError;
pub use category::ErrorCategory;
pub use context::ErrorContext;
pub use market_error::MarketError;
pub use network::{classify_http_error, NetworkError};
pub use query::QueryError;
pub use result::{MarketResult, ResultExt};
pub use system::SystemError;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_every_domain_converts_and_classifies() {
        let errors: Vec<(MarketError, ErrorCategory)> = vec![
            (NetworkError::Cancelled.into(), ErrorCategory::Network),
            (
                BackendError::Api {
                    status: 409,
                    code: Some("23505".to_string()),
                    message: "duplicate key".to_string(),
                }
                .into(),
                ErrorCategory::Client,
            ),
            (AuthError::NotAuthenticated.into(), ErrorCategory::Auth),
            (QueryError::Timeout(std::time::Duration::from_secs(5)).into(), ErrorCategory::Network),
            (SystemError::NoHomeDirectory.into(), ErrorCategory::System),
        ];

        for (err, category) in errors {
            assert_eq!(err.category(), category, "{:?}", err);
            assert!(!err.error_code().is_empty());
            assert!(!err.user_message().is_empty());
        }
    }

    #[test]
    fn test_reauth_detection() {
        let reauth: Vec<MarketError> = vec![
            AuthError::TokenExpired.into(),
            AuthError::RefreshTokenInvalid.into(),
            QueryError::Unauthenticated.into(),
            QueryError::Backend(BackendError::Api {
                status: 401,
                code: None,
                message: "JWT expired".to_string(),
            })
            .into(),
        ];
        for err in reauth {
            assert!(err.requires_reauth(), "{:?}", err);
        }

        let no_reauth: Vec<MarketError> = vec![
            AuthError::InvalidCredentials.into(),
            BackendError::Api {
                status: 403,
                code: None,
                message: "forbidden".to_string(),
            }
            .into(),
        ];
        for err in no_reauth {
            assert!(!err.requires_reauth(), "{:?}", err);
        }
    }

    #[test]
    fn test_json_error_is_backend_decode() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: MarketError = json_err.into();
        assert!(matches!(err, MarketError::Backend(BackendError::Decode { .. })));
        assert_eq!(err.category(), ErrorCategory::Server);
    }
}
