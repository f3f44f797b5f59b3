//! Concrete implementations of the trait abstractions in `crate::traits`.
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`RestBackend`] - table CRUD and object storage over the REST API
//! - [`RestAuthBackend`] - password auth against the hosted auth API
//! - [`FileSessionStorage`] - session persisted under the home directory
//!
//! The [`mock`] submodule provides test doubles for each of them.

pub mod file_session;
pub mod mock;
pub mod reqwest_http;
pub mod rest_auth;
pub mod rest_backend;

pub use file_session::FileSessionStorage;
pub use mock::{InMemorySessionStorage, MockAuthBackend, MockBackend, MockHttpClient};
pub use reqwest_http::ReqwestHttpClient;
pub use rest_auth::RestAuthBackend;
pub use rest_backend::RestBackend;
