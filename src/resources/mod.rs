//! Marketplace resources on top of the query cache.
//!
//! [`Marketplace`] hands out the accessors consumers use: paginated listing
//! feeds, single listings and profiles, the category list, and the
//! mutations that keep them consistent.
//!
//! ```ignore
//! let market = Marketplace::new(client, backend, store.subscribe());
//! let feed = market.published_listings(false, DEFAULT_PAGE_SIZE);
//! feed.fetch().await?;
//! while feed.has_next_page() {
//!     feed.fetch_next_page().await?;
//! }
//! ```

pub mod categories;
pub mod listings;
pub mod media;
pub mod profiles;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::error::QueryError;
use crate::models::UserId;
use crate::query::QueryClient;
use crate::session::Session;
use crate::traits::{Backend, Row};

pub use categories::CategoriesQuery;
pub use listings::{
    DeleteListing, DeleteScope, ListingById, ListingQuery, UpdateListing, DEFAULT_PAGE_SIZE,
};
pub use media::ImageUpload;
pub use profiles::{ProfileQuery, UpdateProfile};

/// Shared handles every accessor needs.
#[derive(Clone)]
pub struct Marketplace {
    client: QueryClient,
    backend: Arc<dyn Backend>,
    session: watch::Receiver<Option<Session>>,
}

impl Marketplace {
    pub fn new(
        client: QueryClient,
        backend: Arc<dyn Backend>,
        session: watch::Receiver<Option<Session>>,
    ) -> Self {
        Self {
            client,
            backend,
            session,
        }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    pub fn session(&self) -> watch::Receiver<Option<Session>> {
        self.session.clone()
    }

    /// The signed-in user right now, if any.
    pub fn current_user(&self) -> Option<UserId> {
        self.session
            .borrow()
            .as_ref()
            .map(|session| session.user_id().clone())
    }
}

impl std::fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marketplace")
            .field("client", &self.client)
            .field("user", &self.current_user())
            .finish()
    }
}

pub(crate) fn decode_rows<T: DeserializeOwned>(
    resource: &str,
    rows: Vec<Row>,
) -> Result<Vec<T>, QueryError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|err| QueryError::decode(resource, err)))
        .collect()
}

/// Decode the single row of a result expected to hold exactly one.
pub(crate) fn expect_single<T: DeserializeOwned>(
    resource: &str,
    rows: Vec<Row>,
) -> Result<T, QueryError> {
    match rows.len() {
        0 => Err(QueryError::NotFound {
            resource: resource.to_string(),
        }),
        1 => decode_rows(resource, rows)?
            .pop()
            .ok_or_else(|| QueryError::NotFound {
                resource: resource.to_string(),
            }),
        count => Err(QueryError::Cardinality {
            resource: resource.to_string(),
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use serde_json::json;

    #[test]
    fn test_expect_single_cardinality() {
        let none = expect_single::<Category>("category", vec![]);
        assert_eq!(
            none,
            Err(QueryError::NotFound {
                resource: "category".to_string()
            })
        );

        let two = expect_single::<Category>(
            "category",
            vec![json!({ "id": 1, "title": "a" }), json!({ "id": 2, "title": "b" })],
        );
        assert_eq!(
            two,
            Err(QueryError::Cardinality {
                resource: "category".to_string(),
                count: 2
            })
        );

        let one = expect_single::<Category>("category", vec![json!({ "id": 1, "title": "a" })]);
        assert_eq!(one.unwrap().title, "a");
    }

    #[test]
    fn test_decode_error_names_resource() {
        let err = decode_rows::<Category>("category", vec![json!({ "id": "x" })]).unwrap_err();
        assert!(matches!(err, QueryError::Decode { ref resource, .. } if resource == "category"));
    }
}
