//! The error carried by fetch and mutation state.
//!
//! `QueryError` is `Clone` because one failed fetch is observed by every
//! consumer of the same query key.

use std::time::Duration;

use thiserror::Error;

use super::backend::BackendError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("no {resource} row matched")]
    NotFound { resource: String },

    #[error("expected exactly one {resource} row, got {count}")]
    Cardinality { resource: String, count: usize },

    #[error("query was cancelled")]
    Cancelled,

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not decode {resource}: {message}")]
    Decode { resource: String, message: String },

    #[error("a signed-in user is required")]
    Unauthenticated,
}

impl QueryError {
    pub(crate) fn decode(resource: &str, err: serde_json::Error) -> Self {
        QueryError::Decode {
            resource: resource.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            QueryError::Backend(err) => err.is_retryable(),
            QueryError::Timeout(_) => true,
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            QueryError::Backend(err) => err.user_message(),
            QueryError::NotFound { resource } => format!("That {} no longer exists.", resource),
            QueryError::Cardinality { .. } | QueryError::Decode { .. } => {
                "Received an unexpected response.".to_string()
            }
            QueryError::Cancelled => "The request was cancelled.".to_string(),
            QueryError::Timeout(_) => "The request took too long. Please try again.".to_string(),
            QueryError::Unauthenticated => "You need to sign in first.".to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::Backend(err) => err.error_code(),
            QueryError::NotFound { .. } => "E_QUERY_NOT_FOUND",
            QueryError::Cardinality { .. } => "E_QUERY_CARDINALITY",
            QueryError::Cancelled => "E_QUERY_CANCELLED",
            QueryError::Timeout(_) => "E_QUERY_TIMEOUT",
            QueryError::Decode { .. } => "E_QUERY_DECODE",
            QueryError::Unauthenticated => "E_QUERY_UNAUTH",
        }
    }
}
