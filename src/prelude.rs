//! Prelude module for convenient imports.
//!
//! ```ignore
//! use bazaar::prelude::*;
//! ```
//!
//! This imports the record types, the query cache and its handles, the
//! [`Marketplace`] accessors, the session types and the unified error.

// Records
pub use crate::models::{Category, Listing, ListingId, ListingPatch, ListingStatus, Profile, ProfilePatch, UserId};

// Query cache
pub use crate::query::{
    range_for, EntityQuery, InfiniteData, InfiniteQuery, Mutation, QueryClient, QueryConfig,
    QueryKey, QueryState, StaleTime,
};

// Resources
pub use crate::resources::{DeleteListing, DeleteScope, Marketplace, UpdateListing, UpdateProfile};

// Session
pub use crate::session::{AuthGate, AuthService, Session, SessionStore};

// Errors
pub use crate::error::{MarketError, MarketResult, QueryError};
