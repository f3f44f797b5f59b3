//! Authentication service abstraction.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::session::Session;

/// Remote auth service issuing [`Session`]s.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    /// Register a new account. Returns `None` when the service requires the
    /// email address to be confirmed before a session is issued.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError>;

    /// Revoke the session server-side.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;

    async fn update_password(&self, access_token: &str, new_password: &str)
        -> Result<(), AuthError>;
}
