//! Sign-in lifecycle: restore, sign in/up/out, refresh, password change.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::password;
use super::store::SessionStore;
use super::Session;
use crate::error::AuthError;
use crate::traits::{AuthBackend, SessionStorage, SessionStorageError};

/// Keeps the [`SessionStore`], the persisted session and the auth service
/// in agreement.
pub struct AuthService {
    auth: Arc<dyn AuthBackend>,
    storage: Arc<dyn SessionStorage>,
    store: Arc<SessionStore>,
}

fn storage_error(err: SessionStorageError) -> AuthError {
    AuthError::Storage {
        message: err.to_string(),
    }
}

impl AuthService {
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        storage: Arc<dyn SessionStorage>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            auth,
            storage,
            store,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Load the persisted session, refreshing it first when expired.
    ///
    /// A session whose refresh is rejected is discarded and `Ok(None)` is
    /// returned; the user simply has to sign in again.
    pub async fn restore(&self) -> Result<Option<Session>, AuthError> {
        let Some(saved) = self.storage.load().await.map_err(storage_error)? else {
            debug!("no saved session");
            return Ok(None);
        };

        if !saved.is_expired() {
            self.store.set(saved.clone());
            return Ok(Some(saved));
        }

        match self.auth.refresh(&saved.refresh_token).await {
            Ok(session) => {
                self.commit(session.clone()).await?;
                Ok(Some(session))
            }
            Err(err) if err.requires_reauth() => {
                warn!(error = %err, "saved session could not be refreshed");
                self.storage.clear().await.map_err(storage_error)?;
                self.store.clear();
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let session = self.auth.sign_in_with_password(email, password).await?;
        self.commit(session.clone()).await?;
        info!(user = %session.user_id(), "signed in");
        Ok(session)
    }

    /// Register an account. Signs in straight away unless the service wants
    /// the address confirmed first, in which case `Ok(None)` is returned.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let session = self.auth.sign_up(email, password).await?;
        if let Some(session) = &session {
            self.commit(session.clone()).await?;
            info!(user = %session.user_id(), "signed up");
        }
        Ok(session)
    }

    /// Forget the session locally even when revoking it remotely fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let remote = match self.store.current() {
            Some(session) => self.auth.sign_out(&session.access_token).await,
            None => Ok(()),
        };
        if let Err(err) = &remote {
            warn!(error = %err, "remote sign-out failed, clearing local session anyway");
        }

        self.store.clear();
        self.storage.clear().await.map_err(storage_error)?;
        info!("signed out");
        remote
    }

    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let current = self.store.current().ok_or(AuthError::NotAuthenticated)?;
        match self.auth.refresh(&current.refresh_token).await {
            Ok(session) => {
                self.commit(session.clone()).await?;
                debug!(user = %session.user_id(), "session refreshed");
                Ok(session)
            }
            Err(err) => {
                warn!(error = %err, "session refresh failed");
                Err(err)
            }
        }
    }

    /// A valid session, refreshed first when it is about to expire.
    pub async fn ensure_fresh(&self) -> Result<Session, AuthError> {
        match self.store.current() {
            Some(session) if !session.is_expired() => Ok(session),
            Some(_) => self.refresh().await,
            None => Err(AuthError::NotAuthenticated),
        }
    }

    /// Change the signed-in user's password. The policy is checked before
    /// anything is sent and every broken rule is reported.
    pub async fn change_password(&self, new_password: &str) -> Result<(), AuthError> {
        let broken = password::violations(new_password);
        if !broken.is_empty() {
            return Err(AuthError::WeakPassword {
                violations: broken.iter().map(|rule| rule.describe()).collect(),
            });
        }
        let session = self.ensure_fresh().await?;
        self.auth
            .update_password(&session.access_token, new_password)
            .await?;
        info!(user = %session.user_id(), "password changed");
        Ok(())
    }

    async fn commit(&self, session: Session) -> Result<(), AuthError> {
        self.storage.save(&session).await.map_err(storage_error)?;
        self.store.set(session);
        Ok(())
    }
}
