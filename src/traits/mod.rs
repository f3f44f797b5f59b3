//! Seams between the cache layer and the outside world.
//!
//! - [`HttpClient`] - raw HTTP transport
//! - [`Backend`] - filtered table CRUD and object storage
//! - [`AuthBackend`] - sign-in, sign-up, refresh and friends
//! - [`SessionStorage`] - where the current session is persisted
//!
//! Production implementations live in [`crate::adapters`], test doubles in
//! [`crate::adapters::mock`].

pub mod auth;
pub mod backend;
pub mod http;
pub mod session_storage;

pub use auth::AuthBackend;
pub use backend::{Backend, Filter, Order, Row, Select};
pub use http::{Headers, HttpClient, HttpError, HttpMethod, Response};
pub use session_storage::{SessionStorage, SessionStorageError};
