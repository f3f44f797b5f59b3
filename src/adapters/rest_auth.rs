//! [`AuthBackend`] over the hosted auth (GoTrue) HTTP API.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::BackendConfig;
use crate::error::{classify_http_error, AuthError};
use crate::models::UserId;
use crate::session::{Session, SessionUser};
use crate::traits::{AuthBackend, Headers, HttpClient, HttpMethod, Response};

/// Body of the token and signup endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: TokenUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenResponse {
    /// Prefer the absolute expiry; fall back to `expires_in` from now.
    pub fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: SessionUser {
                id: UserId::from(self.user.id),
                email: self.user.email,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    weak_password: Option<WeakPasswordBody>,
}

#[derive(Debug, Default, Deserialize)]
struct WeakPasswordBody {
    #[serde(default)]
    reasons: Vec<String>,
}

/// Auth client for the hosted backend.
pub struct RestAuthBackend {
    config: BackendConfig,
    http: Arc<dyn HttpClient>,
}

impl RestAuthBackend {
    pub fn new(config: BackendConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    fn headers(&self, bearer: Option<&str>) -> Headers {
        let mut headers = Headers::new();
        headers.insert("apikey".to_string(), self.config.anon_key.clone());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", bearer.unwrap_or(&self.config.anon_key)),
        );
        headers
    }

    async fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<serde_json::Value>,
        bearer: Option<&str>,
    ) -> Result<Response, AuthError> {
        let url = format!("{}{}", self.config.auth_url(), endpoint);
        debug!(%method, url, "auth request");
        let body = body.map(|value| Bytes::from(value.to_string()));
        self.http
            .request(method, &url, body, &self.headers(bearer))
            .await
            .map_err(|err| AuthError::Network(classify_http_error(err, &url)))
    }

    fn session(response: &Response) -> Result<Session, AuthError> {
        response
            .json::<TokenResponse>()
            .map(TokenResponse::into_session)
            .map_err(|err| AuthError::ApiError {
                status: response.status,
                message: format!("malformed token response: {}", err),
            })
    }
}

fn error_body(response: &Response) -> AuthErrorBody {
    response.json().unwrap_or_default()
}

fn api_error(response: &Response) -> AuthError {
    let body = error_body(response);
    let message = body
        .error_description
        .or(body.msg)
        .or(body.message)
        .or(body.error)
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    AuthError::ApiError {
        status: response.status,
        message,
    }
}

#[async_trait]
impl AuthBackend for RestAuthBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .send(
                HttpMethod::Post,
                "/token?grant_type=password",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await?;
        match response.status {
            200..=299 => {
                let session = Self::session(&response)?;
                info!(user = %session.user.id, "signed in");
                Ok(session)
            }
            400 => Err(AuthError::InvalidCredentials),
            _ => Err(api_error(&response)),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        let response = self
            .send(
                HttpMethod::Post,
                "/signup",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await?;
        if response.status == 422 {
            if let Some(weak) = error_body(&response).weak_password {
                return Err(AuthError::WeakPassword {
                    violations: weak.reasons,
                });
            }
        }
        if !response.is_success() {
            return Err(api_error(&response));
        }

        // Without an access token the account is waiting on email confirmation.
        let body: serde_json::Value = response.json().map_err(|err| AuthError::ApiError {
            status: response.status,
            message: err.to_string(),
        })?;
        if body.get("access_token").is_none() {
            info!(email, "signed up, confirmation pending");
            return Ok(None);
        }
        Self::session(&response).map(Some)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .send(HttpMethod::Post, "/logout", None, Some(access_token))
            .await?;
        // An already revoked token is as good as signed out.
        if response.is_success() || response.status == 401 {
            Ok(())
        } else {
            Err(api_error(&response))
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let response = self
            .send(
                HttpMethod::Post,
                "/token?grant_type=refresh_token",
                Some(json!({ "refresh_token": refresh_token })),
                None,
            )
            .await?;
        match response.status {
            200..=299 => Self::session(&response),
            400 | 401 => Err(AuthError::RefreshTokenInvalid),
            _ => Err(api_error(&response)),
        }
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let response = self
            .send(
                HttpMethod::Put,
                "/user",
                Some(json!({ "password": new_password })),
                Some(access_token),
            )
            .await?;
        match response.status {
            200..=299 => Ok(()),
            401 => Err(AuthError::TokenExpired),
            422 => {
                let body = error_body(&response);
                let violations = match (body.weak_password, body.msg.or(body.message)) {
                    (Some(weak), _) if !weak.reasons.is_empty() => weak.reasons,
                    (_, Some(message)) => vec![message],
                    _ => vec!["rejected by the server".to_string()],
                };
                Err(AuthError::WeakPassword { violations })
            }
            _ => Err(api_error(&response)),
        }
    }
}
