//! Context attached to errors for logging.

use chrono::{DateTime, Utc};
use std::fmt;

/// Where and when an error happened.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    /// The operation that failed, e.g. `"delete_listing"`.
    pub operation: String,

    /// Backend resource involved (table or bucket).
    pub resource: Option<String>,

    /// Rendered query key, when the failure belongs to one.
    pub query_key: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Manual retries performed by the caller so far.
    pub retry_count: u32,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            resource: None,
            query_key: None,
            timestamp: Utc::now(),
            retry_count: 0,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_query_key(mut self, key: impl fmt::Display) -> Self {
        self.query_key = Some(key.to_string());
        self
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn next_retry(&self) -> Self {
        Self {
            timestamp: Utc::now(),
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }

    /// Single-line `key=value` form for log fields.
    pub fn to_log_string(&self) -> String {
        let mut parts = vec![format!("op={}", self.operation)];
        if let Some(resource) = &self.resource {
            parts.push(format!("resource={}", resource));
        }
        if let Some(key) = &self.query_key {
            parts.push(format!("key={}", key));
        }
        if self.retry_count > 0 {
            parts.push(format!("retry={}", self.retry_count));
        }
        parts.push(format!("at={}", self.timestamp.to_rfc3339()));
        parts.join(" ")
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if let Some(resource) = &self.resource {
            write!(f, " on {}", resource)?;
        }
        if let Some(key) = &self.query_key {
            write!(f, " [{}]", key)?;
        }
        if self.retry_count > 0 {
            write!(f, " (retry {})", self.retry_count)?;
        }
        Ok(())
    }
}
