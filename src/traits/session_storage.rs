//! Persistence of the current session between runs.

use async_trait::async_trait;
use std::fmt;

use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStorageError {
    Io(String),
    Serialization(String),
    NoHomeDirectory,
}

impl fmt::Display for SessionStorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStorageError::Io(msg) => write!(f, "IO error: {}", msg),
            SessionStorageError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            SessionStorageError::NoHomeDirectory => write!(f, "Home directory not found"),
        }
    }
}

impl std::error::Error for SessionStorageError {}

/// Where the signed-in session is kept.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// `Ok(None)` when nothing has been stored.
    async fn load(&self) -> Result<Option<Session>, SessionStorageError>;

    async fn save(&self, session: &Session) -> Result<(), SessionStorageError>;

    /// Removing an absent session is not an error.
    async fn clear(&self) -> Result<(), SessionStorageError>;
}
