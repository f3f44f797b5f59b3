//! Who is signed in, and everything that follows from it.
//!
//! - [`Session`] - tokens and user issued by the auth service
//! - [`SessionStore`] - the single owner of the current session
//! - [`AuthService`] - sign-in lifecycle over an auth backend and storage
//! - [`AuthGate`] - evicts cache entries when the user changes
//! - [`password`] - password policy

mod auth_service;
mod gate;
pub mod password;
#[allow(clippy::module_inception)]
mod session;
mod store;

pub use auth_service::AuthService;
pub use gate::{user_changed, AuthGate};
pub use session::{Session, SessionUser};
pub use store::SessionStore;
