//! Backend record types.
//!
//! These mirror the rows of the `products`, `profiles` and `categories`
//! tables. The backend owns their lifecycle; the client only ever holds
//! projections of them in the query cache.

mod category;
mod listing;
mod profile;

pub use category::Category;
pub use listing::{Listing, ListingDraft, ListingId, ListingPatch, ListingStatus};
pub use profile::{Profile, ProfilePatch};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an authenticated user (and of their profile row).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Table names used by the resource fetchers.
pub mod tables {
    pub const PRODUCTS: &str = "products";
    pub const PROFILES: &str = "profiles";
    pub const CATEGORIES: &str = "categories";
}

/// Object storage buckets.
pub mod buckets {
    pub const PRODUCT_IMAGES: &str = "product-images";
    pub const AVATARS: &str = "avatars";
}
