//! HTTP client trait abstraction.
//!
//! The REST and auth adapters speak HTTP only through this trait so that
//! tests can swap in [`MockHttpClient`](crate::adapters::mock::MockHttpClient).

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// Request methods used by the backend protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP response wrapper.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: Bytes) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    pub fn with_headers(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Transport-level HTTP failures.
#[derive(Debug, Clone)]
pub enum HttpError {
    ConnectionFailed(String),
    Timeout(String),
    ServerError { status: u16, message: String },
    Cancelled,
    Io(String),
    InvalidUrl(String),
    Other(String),
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::ServerError { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            HttpError::Cancelled => write!(f, "Request cancelled"),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for HTTP client operations.
///
/// Only [`request`](HttpClient::request) is required; `get` and `post` are
/// conveniences on top of it. A non-2xx status is *not* an error at this
/// level: callers inspect [`Response::status`] themselves.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<Bytes>,
        headers: &Headers,
    ) -> Result<Response, HttpError>;

    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.request(HttpMethod::Get, url, None, headers).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.request(
            HttpMethod::Post,
            url,
            Some(Bytes::copy_from_slice(body.as_bytes())),
            headers,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_is_success() {
        assert!(Response::new(200, Bytes::new()).is_success());
        assert!(Response::new(204, Bytes::new()).is_success());
        assert!(!Response::new(300, Bytes::new()).is_success());
        assert!(!Response::new(406, Bytes::new()).is_success());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("Content-Range".to_string(), "0-7/42".to_string());
        let response = Response::with_headers(206, headers, Bytes::new());
        assert_eq!(response.header("content-range"), Some("0-7/42"));
        assert_eq!(response.header("etag"), None);
    }

    #[test]
    fn test_response_json() {
        let response = Response::new(200, Bytes::from(r#"[{"id":1},{"id":2}]"#));
        let rows: Vec<serde_json::Value> = response.json().unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_http_error_display() {
        assert_eq!(
            HttpError::ServerError {
                status: 500,
                message: "Internal Error".to_string()
            }
            .to_string(),
            "Server error (500): Internal Error"
        );
        assert_eq!(HttpError::Cancelled.to_string(), "Request cancelled");
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
    }
}
