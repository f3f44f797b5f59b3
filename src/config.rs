//! Backend configuration.
//!
//! ```ignore
//! use bazaar::config::BackendConfig;
//!
//! let config = BackendConfig::from_env()?
//!     .with_request_timeout(std::time::Duration::from_secs(20));
//! ```

use std::time::Duration;

use crate::error::SystemError;

pub const ENV_URL: &str = "BAZAAR_URL";
pub const ENV_ANON_KEY: &str = "BAZAAR_ANON_KEY";
pub const ENV_TIMEOUT_SECS: &str = "BAZAAR_TIMEOUT_SECS";

/// Where the hosted backend lives and how to reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Project base URL, without trailing slash.
    pub url: String,
    /// Public (anonymous) API key, sent with every request.
    pub anon_key: String,
    /// Upper bound on one backend call. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Read `BAZAAR_URL`, `BAZAAR_ANON_KEY` and the optional
    /// `BAZAAR_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, SystemError> {
        let url = required_var(ENV_URL)?;
        let anon_key = required_var(ENV_ANON_KEY)?;
        let mut config = Self::new(url, anon_key);

        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| SystemError::EnvironmentError {
                variable: ENV_TIMEOUT_SECS.to_string(),
                message: format!("expected a whole number of seconds, got '{}'", raw),
            })?;
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SystemError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(SystemError::EnvironmentError {
                variable: ENV_URL.to_string(),
                message: format!("'{}' is not an http(s) URL", self.url),
            });
        }
        if self.anon_key.trim().is_empty() {
            return Err(SystemError::EnvironmentError {
                variable: ENV_ANON_KEY.to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.url)
    }

    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.url)
    }
}

fn required_var(name: &str) -> Result<String, SystemError> {
    std::env::var(name).map_err(|_| SystemError::EnvironmentError {
        variable: name.to_string(),
        message: "not set".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(ENV_URL);
        std::env::remove_var(ENV_ANON_KEY);
        std::env::remove_var(ENV_TIMEOUT_SECS);
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = BackendConfig::new("https://demo.example.co/", "anon");
        assert_eq!(config.url, "https://demo.example.co");
        assert_eq!(config.rest_url(), "https://demo.example.co/rest/v1");
        assert_eq!(config.auth_url(), "https://demo.example.co/auth/v1");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        std::env::set_var(ENV_URL, "http://localhost:54321");
        std::env::set_var(ENV_ANON_KEY, "anon-key");
        std::env::set_var(ENV_TIMEOUT_SECS, "15");

        let config = BackendConfig::from_env().unwrap();
        assert_eq!(config.url, "http://localhost:54321");
        assert_eq!(config.anon_key, "anon-key");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_url() {
        clear_env();
        std::env::set_var(ENV_ANON_KEY, "anon-key");
        let err = BackendConfig::from_env().unwrap_err();
        assert!(matches!(err, SystemError::EnvironmentError { ref variable, .. } if variable == ENV_URL));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_bad_timeout() {
        clear_env();
        std::env::set_var(ENV_URL, "http://localhost:54321");
        std::env::set_var(ENV_ANON_KEY, "anon-key");
        std::env::set_var(ENV_TIMEOUT_SECS, "soon");
        assert!(BackendConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_validate_rejects_non_http() {
        assert!(BackendConfig::new("ftp://x", "k").validate().is_err());
        assert!(BackendConfig::new("https://x", " ").validate().is_err());
    }
}
