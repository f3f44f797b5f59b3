//! Integration tests for listing writes and their cache reconciliation.
//!
//! These tests verify:
//! 1. Optimistic delete removes the listing from every cached collection in
//!    scope before the backend confirms
//! 2. A failed delete or update restores exactly the snapshotted entries
//! 3. Entries outside the target prefixes are never touched
//! 4. Create and update invalidate the collections whose membership changed

mod common;

use bazaar::adapters::mock::BackendOp;
use bazaar::error::{BackendError, QueryError};
use bazaar::models::{tables, Listing, ListingId, ListingPatch, ListingStatus};
use bazaar::query::InfiniteData;
use bazaar::resources::listings::keys;
use bazaar::resources::{DeleteListing, UpdateListing};
use common::{listing_row, listing_rows, MarketFixture};

fn ids(listings: Vec<Listing>) -> Vec<ListingId> {
    listings.into_iter().map(|listing| listing.id).collect()
}

fn server_error() -> BackendError {
    BackendError::Api {
        status: 500,
        code: None,
        message: "boom".to_string(),
    }
}

/// u1 owns published listings 3, 5, 7 and draft 9.
fn seeded() -> MarketFixture {
    let fx = MarketFixture::signed_in("u1");
    let mut rows = vec![
        listing_row(3, "u1", true),
        listing_row(5, "u1", true),
        listing_row(7, "u1", true),
    ];
    rows.push(listing_row(9, "u1", false));
    fx.backend.seed(tables::PRODUCTS, rows);
    fx
}

#[tokio::test]
async fn test_delete_is_visible_before_backend_confirms() {
    let fx = seeded();
    let own = fx.market.published_listings(true, 8);
    own.fetch().await.unwrap();
    assert_eq!(ids(own.items()), vec![7, 5, 3]);

    let held = fx.backend.hold_next(BackendOp::Delete);
    let delete = fx.market.delete_listing();
    let running = delete.clone();
    let task = tokio::spawn(async move { running.mutate(DeleteListing::new(5)).await });

    held.started().await;
    assert!(delete.is_pending());
    assert_eq!(ids(own.items()), vec![7, 3]);

    held.release();
    task.await.unwrap().unwrap();
    assert!(delete.is_success());
    assert_eq!(ids(own.items()), vec![7, 3]);
    assert_eq!(fx.backend.rows(tables::PRODUCTS).len(), 3);
}

#[tokio::test]
async fn test_failed_delete_restores_every_collection() {
    let fx = seeded();
    let own = fx.market.published_listings(true, 8);
    let drafts = fx.market.draft_listings(8);
    own.fetch().await.unwrap();
    drafts.fetch().await.unwrap();

    fx.backend.fail_next(BackendOp::Delete, server_error());
    let delete = fx.market.delete_listing();
    let err = delete.mutate(DeleteListing::new(5)).await.unwrap_err();

    assert_eq!(err, QueryError::Backend(server_error()));
    assert_eq!(delete.error(), Some(QueryError::Backend(server_error())));
    assert_eq!(ids(own.items()), vec![7, 5, 3]);
    assert_eq!(ids(drafts.items()), vec![9]);
    assert_eq!(fx.backend.rows(tables::PRODUCTS).len(), 4);
}

#[tokio::test]
async fn test_scoped_delete_leaves_other_collections_alone() {
    let fx = seeded();
    let own = fx.market.published_listings(true, 8);
    let drafts = fx.market.draft_listings(8);
    own.fetch().await.unwrap();
    drafts.fetch().await.unwrap();
    let drafts_key = drafts.key().unwrap();
    let drafts_before = fx
        .client()
        .get_query_data::<InfiniteData<Listing>>(&drafts_key);

    fx.market
        .delete_listing()
        .mutate(DeleteListing::in_status(9, ListingStatus::Published))
        .await
        .unwrap();

    // Draft 9 is gone from the backend, but the drafts entry was out of scope
    assert_eq!(
        fx.client()
            .get_query_data::<InfiniteData<Listing>>(&drafts_key),
        drafts_before
    );
    assert_eq!(ids(own.items()), vec![7, 5, 3]);
}

#[tokio::test]
async fn test_delete_from_full_page_keeps_pagination_going() {
    let fx = MarketFixture::signed_in("u1");
    fx.backend.seed(tables::PRODUCTS, listing_rows("u2", 1..=12, true));
    let feed = fx.market.published_listings(false, 8);
    feed.fetch().await.unwrap();
    assert!(feed.has_next_page());

    fx.market
        .delete_listing()
        .mutate(DeleteListing::new(12))
        .await
        .unwrap();
    assert_eq!(feed.items().len(), 7);
    assert!(feed.has_next_page());

    assert!(feed.fetch_next_page().await.unwrap());
    // Offset 8 of the shrunken table starts at listing 3.
    assert_eq!(ids(feed.items()), vec![11, 10, 9, 8, 7, 6, 5, 3, 2, 1]);
    assert!(!feed.has_next_page());
}

#[tokio::test]
async fn test_delete_drops_cached_detail() {
    let fx = seeded();
    let detail = fx.market.listing(Some(5));
    detail.fetch().await.unwrap();
    assert!(fx.client().keys().contains(&keys::detail(5)));

    fx.market
        .delete_listing()
        .mutate(DeleteListing::new(5))
        .await
        .unwrap();
    assert!(!fx.client().keys().contains(&keys::detail(5)));
}

#[tokio::test]
async fn test_delete_cancels_in_flight_refetch() {
    let fx = seeded();
    let own = fx.market.published_listings(true, 8);
    own.fetch().await.unwrap();

    let held = fx.backend.hold_next(BackendOp::Select);
    let refetching = own.clone();
    let refetch = tokio::spawn(async move { refetching.refetch().await });
    held.started().await;

    fx.market
        .delete_listing()
        .mutate(DeleteListing::new(5))
        .await
        .unwrap();
    held.release();

    assert_eq!(refetch.await.unwrap(), Err(QueryError::Cancelled));
    assert_eq!(ids(own.items()), vec![7, 3]);
}

#[tokio::test]
async fn test_update_edits_in_place_and_rolls_back() {
    let fx = seeded();
    let own = fx.market.published_listings(true, 8);
    own.fetch().await.unwrap();
    let update = fx.market.update_listing();

    fx.backend.fail_next(BackendOp::Update, server_error());
    let failed = update
        .mutate(UpdateListing {
            id: 5,
            patch: ListingPatch::new().with_title("Renamed"),
        })
        .await;
    assert!(failed.is_err());
    let titles: Vec<_> = own.items().into_iter().map(|l| l.title).collect();
    assert_eq!(titles[1].as_deref(), Some("Listing 5"));

    let listing = update
        .mutate(UpdateListing {
            id: 5,
            patch: ListingPatch::new().with_title("Renamed"),
        })
        .await
        .unwrap();
    assert_eq!(listing.title.as_deref(), Some("Renamed"));
    assert_eq!(own.items()[1].title.as_deref(), Some("Renamed"));

    // Title edits keep collection membership, so the feed stays fresh
    assert!(!own.state().is_invalidated);
}

#[tokio::test]
async fn test_publishing_invalidates_every_collection() {
    let fx = seeded();
    let own = fx.market.published_listings(true, 8);
    let drafts = fx.market.draft_listings(8);
    own.fetch().await.unwrap();
    drafts.fetch().await.unwrap();

    fx.market
        .update_listing()
        .mutate(UpdateListing {
            id: 9,
            patch: ListingPatch::new().with_published(true),
        })
        .await
        .unwrap();

    assert!(own.state().is_invalidated);
    assert!(drafts.state().is_invalidated);

    drafts.fetch().await.unwrap();
    own.fetch().await.unwrap();
    assert!(drafts.items().is_empty());
    assert_eq!(ids(own.items()), vec![9, 7, 5, 3]);
}

#[tokio::test]
async fn test_create_listing_requires_a_user() {
    let fx = MarketFixture::signed_out();
    let create = fx.market.create_listing();
    assert_eq!(create.mutate(()).await, Err(QueryError::Unauthenticated));
    assert!(fx.backend.calls().is_empty());
}

#[tokio::test]
async fn test_create_listing_inserts_draft_and_invalidates_drafts() {
    let fx = MarketFixture::signed_in("u1");
    fx.backend.seed(tables::PRODUCTS, listing_rows("u1", 1..=2, false));
    let drafts = fx.market.draft_listings(8);
    drafts.fetch().await.unwrap();

    let created = fx.market.create_listing().mutate(()).await.unwrap();
    assert_eq!(created.id, 3);
    assert_eq!(created.user_id.as_str(), "u1");
    assert!(!created.published);
    assert!(drafts.state().is_invalidated);

    drafts.fetch().await.unwrap();
    assert_eq!(ids(drafts.items())[0], 3);
}
