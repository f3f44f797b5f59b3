//! HTTP-level fixtures built on wiremock.

use std::sync::Arc;

use bazaar::adapters::ReqwestHttpClient;
use bazaar::config::BackendConfig;
use bazaar::traits::HttpClient;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const ANON_KEY: &str = "anon-test-key";

/// A wiremock server plus a config pointing at it.
pub struct TestServer {
    pub server: MockServer,
    pub config: BackendConfig,
}

impl TestServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let config = BackendConfig::new(server.uri(), ANON_KEY);
        Self { server, config }
    }

    pub fn http(&self) -> Arc<dyn HttpClient> {
        Arc::new(ReqwestHttpClient::new())
    }
}

/// Body of a successful token grant.
#[allow(dead_code)]
pub fn token_json(user: &str, access: &str, refresh: &str) -> Value {
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": refresh,
        "user": { "id": user, "email": format!("{}@example.com", user) }
    })
}
