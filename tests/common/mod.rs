//! Common test utilities for integration tests.
//!
//! # Example
//!
//! ```ignore
//! let fx = MarketFixture::signed_in("u1");
//! fx.backend.seed(tables::PRODUCTS, listing_rows("u2", 1..=11, true));
//! let feed = fx.market.published_listings(false, 8);
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;

use bazaar::adapters::mock::MockBackend;
use bazaar::models::UserId;
use bazaar::query::QueryClient;
use bazaar::resources::Marketplace;
use bazaar::session::{Session, SessionStore, SessionUser};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};

/// A session for `user` that won't expire during test execution.
pub fn test_session(user: &str) -> Session {
    Session {
        access_token: format!("access-{}-0", user),
        refresh_token: format!("refresh-{}-0", user),
        expires_at: Utc::now().timestamp() + 3600,
        user: SessionUser {
            id: UserId::from(user),
            email: Some(format!("{}@example.com", user)),
        },
    }
}

/// An already expired session for `user`.
#[allow(dead_code)]
pub fn expired_session(user: &str) -> Session {
    Session {
        expires_at: 0,
        ..test_session(user)
    }
}

/// A `products` row. Higher ids are newer, so newest-first ordering is
/// descending id order.
pub fn listing_row(id: i64, owner: &str, published: bool) -> Value {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let created_at = base + Duration::minutes(id);
    json!({
        "id": id,
        "user_id": owner,
        "title": format!("Listing {}", id),
        "description": null,
        "price": id * 10,
        "category_id": null,
        "images": [],
        "published": published,
        "created_at": created_at.to_rfc3339(),
    })
}

pub fn listing_rows(owner: &str, ids: impl IntoIterator<Item = i64>, published: bool) -> Vec<Value> {
    ids.into_iter()
        .map(|id| listing_row(id, owner, published))
        .collect()
}

/// A [`Marketplace`] over a [`MockBackend`] and a live [`SessionStore`].
pub struct MarketFixture {
    pub backend: MockBackend,
    pub store: Arc<SessionStore>,
    pub market: Marketplace,
}

impl MarketFixture {
    pub fn signed_out() -> Self {
        Self::with_store(SessionStore::new())
    }

    pub fn signed_in(user: &str) -> Self {
        Self::with_store(SessionStore::with_session(test_session(user)))
    }

    fn with_store(store: SessionStore) -> Self {
        let backend = MockBackend::new();
        let store = Arc::new(store);
        let market = Marketplace::new(
            QueryClient::default(),
            Arc::new(backend.clone()),
            store.subscribe(),
        );
        Self {
            backend,
            store,
            market,
        }
    }

    pub fn client(&self) -> &QueryClient {
        self.market.client()
    }
}
