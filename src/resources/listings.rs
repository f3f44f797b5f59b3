//! Listing feeds, single listings and listing writes.
//!
//! Cache keys:
//!
//! | Query | Key |
//! |---|---|
//! | drafts | `["listings", "draft", limit]` |
//! | published feed | `["listings", "published", "own" \| "others", user, limit]` |
//! | search | `["listings", "search", user, text, limit]` |
//! | one listing | `["listing", id]` |

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{decode_rows, expect_single, Marketplace};
use crate::error::QueryError;
use crate::models::{tables, Listing, ListingDraft, ListingId, ListingPatch, ListingStatus, UserId};
use crate::query::{
    optimistic, range_for, EntityQuery, InfiniteData, InfiniteQuery, Mutation, PageCursor,
    PagedQuery, QueryGate, QueryKey, SingleQuery,
};
use crate::traits::{Backend, Filter, Select};

/// Page size used by the feeds unless a caller picks another.
pub const DEFAULT_PAGE_SIZE: usize = 8;

const RESOURCE: &str = "listing";

/// Key prefixes for listing queries.
pub mod keys {
    use super::*;

    /// Every paginated listing collection.
    pub fn all() -> QueryKey {
        QueryKey::new("listings")
    }

    pub fn drafts() -> QueryKey {
        all().with("draft")
    }

    pub fn published() -> QueryKey {
        all().with("published")
    }

    pub fn search() -> QueryKey {
        all().with("search")
    }

    pub fn detail(id: ListingId) -> QueryKey {
        QueryKey::new(RESOURCE).with(id)
    }
}

/// The listing collections a consumer can page through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListingQuery {
    /// Unpublished listings. Row-level policy limits these to the
    /// signed-in seller's own rows.
    Draft { limit: usize },
    /// Published listings owned by `user_id` (`own`) or by anyone else.
    Published {
        user_id: UserId,
        own: bool,
        limit: usize,
    },
    /// Published listings by other users whose title contains `text`.
    Search {
        user_id: UserId,
        text: String,
        limit: usize,
    },
}

impl ListingQuery {
    /// A search for `text`, or `None` while the text is blank.
    pub fn search(user_id: UserId, text: &str, limit: usize) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(ListingQuery::Search {
            user_id,
            text: text.to_string(),
            limit,
        })
    }

    /// The backend request for page `cursor`, newest first.
    pub fn select(&self, cursor: PageCursor) -> Select {
        let select = Select::from(tables::PRODUCTS);
        let select = match self {
            ListingQuery::Draft { .. } => select.eq("published", false),
            ListingQuery::Published {
                user_id, own: true, ..
            } => select.eq("published", true).eq("user_id", user_id.as_str()),
            ListingQuery::Published {
                user_id, own: false, ..
            } => select.eq("published", true).neq("user_id", user_id.as_str()),
            ListingQuery::Search { user_id, text, .. } => select
                .eq("published", true)
                .neq("user_id", user_id.as_str())
                .contains("title", text.as_str()),
        };
        select
            .order("created_at", false)
            .range(range_for(cursor, self.limit()))
    }
}

#[async_trait]
impl PagedQuery for ListingQuery {
    type Item = Listing;

    fn key(&self) -> QueryKey {
        match self {
            ListingQuery::Draft { limit } => keys::drafts().with(*limit),
            ListingQuery::Published {
                user_id,
                own,
                limit,
            } => keys::published()
                .with(if *own { "own" } else { "others" })
                .with(user_id)
                .with(*limit),
            ListingQuery::Search {
                user_id,
                text,
                limit,
            } => keys::search()
                .with(user_id)
                .with(text.as_str())
                .with(*limit),
        }
    }

    fn limit(&self) -> usize {
        match self {
            ListingQuery::Draft { limit }
            | ListingQuery::Published { limit, .. }
            | ListingQuery::Search { limit, .. } => *limit,
        }
    }

    async fn fetch_page(
        &self,
        backend: &dyn Backend,
        cursor: PageCursor,
    ) -> Result<Vec<Listing>, QueryError> {
        let rows = backend.select(&self.select(cursor)).await?;
        decode_rows(RESOURCE, rows)
    }
}

/// One listing by primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListingById {
    pub id: ListingId,
}

#[async_trait]
impl SingleQuery for ListingById {
    type Output = Listing;

    fn key(&self) -> QueryKey {
        keys::detail(self.id)
    }

    async fn fetch(&self, backend: &dyn Backend) -> Result<Listing, QueryError> {
        let rows = backend
            .select(&Select::from(tables::PRODUCTS).eq("id", self.id))
            .await?;
        expect_single(RESOURCE, rows)
    }
}

/// Arguments of [`Marketplace::update_listing`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateListing {
    pub id: ListingId,
    pub patch: ListingPatch,
}

/// Which cached collections a delete edits optimistically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    All,
    Status(ListingStatus),
}

impl DeleteScope {
    pub fn targets(&self) -> Vec<QueryKey> {
        match self {
            DeleteScope::All => vec![keys::all()],
            DeleteScope::Status(ListingStatus::Draft) => vec![keys::drafts()],
            // Search results only ever hold published listings.
            DeleteScope::Status(ListingStatus::Published) => vec![keys::published(), keys::search()],
        }
    }
}

/// Arguments of [`Marketplace::delete_listing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteListing {
    pub id: ListingId,
    pub scope: DeleteScope,
}

impl DeleteListing {
    pub fn new(id: ListingId) -> Self {
        Self {
            id,
            scope: DeleteScope::All,
        }
    }

    pub fn in_status(id: ListingId, status: ListingStatus) -> Self {
        Self {
            id,
            scope: DeleteScope::Status(status),
        }
    }
}

fn id_filter(id: ListingId) -> Filter {
    Filter::Eq {
        column: "id".to_string(),
        value: Value::from(id),
    }
}

impl Marketplace {
    /// The signed-in seller's drafts. Inert while signed out.
    pub fn draft_listings(&self, limit: usize) -> InfiniteQuery<ListingQuery> {
        let gate = QueryGate::new(self.session(), move |user: Option<&UserId>| {
            user.map(|_| ListingQuery::Draft { limit })
        });
        InfiniteQuery::new(self.client().clone(), self.backend(), gate)
    }

    /// Published listings of the signed-in user (`own`) or of everyone
    /// else. Inert while signed out.
    pub fn published_listings(&self, own: bool, limit: usize) -> InfiniteQuery<ListingQuery> {
        let gate = QueryGate::new(self.session(), move |user: Option<&UserId>| {
            user.map(|user_id| ListingQuery::Published {
                user_id: user_id.clone(),
                own,
                limit,
            })
        });
        InfiniteQuery::new(self.client().clone(), self.backend(), gate)
    }

    /// Title search over other users' published listings. Inert while
    /// signed out or while `text` is blank.
    pub fn search_listings(&self, text: impl Into<String>, limit: usize) -> InfiniteQuery<ListingQuery> {
        let text = text.into();
        let gate = QueryGate::new(self.session(), move |user: Option<&UserId>| {
            user.and_then(|user_id| ListingQuery::search(user_id.clone(), &text, limit))
        });
        InfiniteQuery::new(self.client().clone(), self.backend(), gate)
    }

    /// One listing. Inert while `id` is `None`.
    pub fn listing(&self, id: Option<ListingId>) -> EntityQuery<ListingById> {
        let gate = QueryGate::new(self.session(), move |_: Option<&UserId>| {
            id.map(|id| ListingById { id })
        });
        EntityQuery::new(self.client().clone(), self.backend(), gate)
    }

    /// Insert an empty draft owned by the signed-in user.
    pub fn create_listing(&self) -> Mutation<(), Listing> {
        let client = self.client().clone();
        let backend = self.backend();
        let session = self.session();
        Mutation::new(move |()| {
            let client = client.clone();
            let backend = backend.clone();
            let user = session
                .borrow()
                .as_ref()
                .map(|session| session.user_id().clone());
            async move {
                let user_id = user.ok_or(QueryError::Unauthenticated)?;
                let row = serde_json::to_value(ListingDraft::empty(user_id))
                    .map_err(|err| QueryError::decode(RESOURCE, err))?;

                let rows = client
                    .with_timeout(async {
                        backend
                            .insert(tables::PRODUCTS, vec![row])
                            .await
                            .map_err(QueryError::from)
                    })
                    .await?;
                let listing: Listing = expect_single(RESOURCE, rows)?;

                info!(id = listing.id, "created draft listing");
                client.invalidate_queries(&keys::drafts());
                Ok(listing)
            }
        })
    }

    /// Patch a listing, editing every cached collection that holds it
    /// before the write is confirmed.
    pub fn update_listing(&self) -> Mutation<UpdateListing, Listing> {
        let client = self.client().clone();
        let backend = self.backend();
        Mutation::new(move |args: UpdateListing| {
            let client = client.clone();
            let backend = backend.clone();
            async move {
                let UpdateListing { id, patch } = args;
                let body = serde_json::to_value(&patch)
                    .map_err(|err| QueryError::decode(RESOURCE, err))?;
                let filters = [id_filter(id)];

                let rows = optimistic::<InfiniteData<Listing>, _, _, _>(
                    &client,
                    &[keys::all()],
                    |data| {
                        data.update_where(|listing| listing.id == id, |listing| listing.apply(&patch));
                    },
                    async {
                        backend
                            .update(tables::PRODUCTS, body, &filters)
                            .await
                            .map_err(QueryError::from)
                    },
                )
                .await?;
                let listing: Listing = expect_single(RESOURCE, rows)?;

                info!(id, published = listing.published, "updated listing");
                client.invalidate_queries(&keys::detail(id));
                if patch.changes_status() {
                    // The listing moved between the draft and published feeds.
                    client.invalidate_queries(&keys::all());
                }
                Ok(listing)
            }
        })
    }

    /// Delete a listing, removing it from the cached collections in scope
    /// before the write is confirmed.
    pub fn delete_listing(&self) -> Mutation<DeleteListing, ()> {
        let client = self.client().clone();
        let backend = self.backend();
        Mutation::new(move |args: DeleteListing| {
            let client = client.clone();
            let backend = backend.clone();
            async move {
                let DeleteListing { id, scope } = args;
                let filters = [id_filter(id)];

                optimistic::<InfiniteData<Listing>, _, _, _>(
                    &client,
                    &scope.targets(),
                    |data| {
                        data.remove_where(|listing| listing.id == id);
                    },
                    async {
                        backend
                            .delete(tables::PRODUCTS, &filters)
                            .await
                            .map_err(QueryError::from)
                    },
                )
                .await?;

                info!(id, "deleted listing");
                client.remove_queries(&keys::detail(id));
                Ok(())
            }
        })
    }
}
