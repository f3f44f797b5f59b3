//! Bazaar - data access and cache coordination for a second-hand marketplace
//!
//! This library exposes modules for use by the `bazaar` binary and by
//! integration tests.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod prelude;
pub mod query;
pub mod resources;
pub mod session;
pub mod traits;
