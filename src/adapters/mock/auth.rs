//! Mock auth service for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::AuthError;
use crate::session::{Session, SessionUser};
use crate::traits::AuthBackend;

/// Auth service over a fixed set of accounts.
///
/// Issued sessions carry `access-<user>-<n>` tokens so tests can tell
/// refreshed sessions apart.
#[derive(Debug, Clone, Default)]
pub struct MockAuthBackend {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    calls: Arc<Mutex<Vec<String>>>,
    issued: Arc<Mutex<u64>>,
    fail_next: Arc<Mutex<Option<AuthError>>>,
    confirm_sign_ups: Arc<Mutex<bool>>,
}

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    password: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockAuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, email: &str, password: &str, user_id: &str) -> Self {
        lock(&self.accounts).insert(
            email.to_string(),
            Account {
                user_id: user_id.to_string(),
                password: password.to_string(),
            },
        );
        self
    }

    /// Make sign-ups wait for email confirmation instead of issuing a session.
    pub fn require_confirmation(&self, required: bool) {
        *lock(&self.confirm_sign_ups) = required;
    }

    pub fn fail_next(&self, error: AuthError) {
        *lock(&self.fail_next) = Some(error);
    }

    /// Names of the operations called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn password_of(&self, email: &str) -> Option<String> {
        lock(&self.accounts).get(email).map(|a| a.password.clone())
    }

    fn enter(&self, op: &str) -> Result<(), AuthError> {
        lock(&self.calls).push(op.to_string());
        match lock(&self.fail_next).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn issue(&self, user_id: &str, email: Option<&str>) -> Session {
        let mut issued = lock(&self.issued);
        *issued += 1;
        Session {
            access_token: format!("access-{}-{}", user_id, issued),
            refresh_token: format!("refresh-{}-{}", user_id, issued),
            expires_at: chrono::Utc::now().timestamp() + 3600,
            user: SessionUser {
                id: user_id.into(),
                email: email.map(str::to_string),
            },
        }
    }

    fn user_for_token<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
        let rest = token.strip_prefix(prefix)?;
        rest.rsplit_once('-').map(|(user, _)| user)
    }

    fn email_for(&self, user_id: &str) -> Option<String> {
        lock(&self.accounts)
            .iter()
            .find(|(_, account)| account.user_id == user_id)
            .map(|(email, _)| email.clone())
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.enter("sign_in")?;
        let account = lock(&self.accounts).get(email).cloned();
        match account {
            Some(account) if account.password == password => {
                Ok(self.issue(&account.user_id, Some(email)))
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        self.enter("sign_up")?;
        let user_id = {
            let mut accounts = lock(&self.accounts);
            if accounts.contains_key(email) {
                return Err(AuthError::ApiError {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }
            let user_id = format!("user-{}", accounts.len() + 1);
            accounts.insert(
                email.to_string(),
                Account {
                    user_id: user_id.clone(),
                    password: password.to_string(),
                },
            );
            user_id
        };

        if *lock(&self.confirm_sign_ups) {
            return Ok(None);
        }
        Ok(Some(self.issue(&user_id, Some(email))))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        self.enter("sign_out")
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.enter("refresh")?;
        let user_id = Self::user_for_token(refresh_token, "refresh-")
            .ok_or(AuthError::RefreshTokenInvalid)?
            .to_string();
        let email = self.email_for(&user_id);
        Ok(self.issue(&user_id, email.as_deref()))
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.enter("update_password")?;
        let user_id = Self::user_for_token(access_token, "access-").ok_or(AuthError::TokenExpired)?;
        let mut accounts = lock(&self.accounts);
        let account = accounts
            .values_mut()
            .find(|account| account.user_id == user_id)
            .ok_or(AuthError::NotAuthenticated)?;
        account.password = new_password.to_string();
        Ok(())
    }
}
