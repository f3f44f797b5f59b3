//! Mock implementations for testing.
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses
//! - [`MockBackend`] - in-memory tables and object storage
//! - [`MockAuthBackend`] - fixed accounts, predictable tokens
//! - [`InMemorySessionStorage`] - session storage without a file system

pub mod auth;
pub mod backend;
pub mod http;
pub mod session;

pub use auth::MockAuthBackend;
pub use backend::{BackendCall, BackendOp, HeldCall, MockBackend};
pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use session::InMemorySessionStorage;
