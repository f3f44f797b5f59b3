//! Integration tests for the session lifecycle and its effect on the cache.
//!
//! These tests verify:
//! 1. Signing out evicts the previous user's entries but keeps shared ones
//! 2. Switching users never serves the old user's feed
//! 3. The auth service persists sessions to disk and restores them
//! 4. An unrefreshable saved session is discarded

mod common;

use std::sync::Arc;
use std::time::Duration;

use bazaar::adapters::mock::{BackendOp, MockAuthBackend};
use bazaar::adapters::FileSessionStorage;
use bazaar::error::AuthError;
use bazaar::models::tables;
use bazaar::query::QueryKey;
use bazaar::session::{AuthGate, AuthService, SessionStore};
use bazaar::traits::SessionStorage;
use common::{expired_session, listing_rows, test_session, MarketFixture};
use serde_json::json;
use tempfile::TempDir;

async fn wait_for<F: Fn() -> bool>(condition: F) {
    let done = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(done.is_ok(), "condition not reached in time");
}

#[tokio::test]
async fn test_sign_out_evicts_user_entries() {
    let fx = MarketFixture::signed_in("u1");
    let mut rows = listing_rows("u2", 1..=3, true);
    rows.extend(listing_rows("u1", 4..=5, false));
    fx.backend.seed(tables::PRODUCTS, rows);
    fx.backend
        .seed(tables::CATEGORIES, vec![json!({ "id": 1, "title": "Bikes" })]);

    let gate = AuthGate::new(fx.client().clone(), fx.store.subscribe()).spawn();

    fx.market.published_listings(false, 8).fetch().await.unwrap();
    fx.market.draft_listings(8).fetch().await.unwrap();
    fx.market.categories().fetch().await.unwrap();
    assert_eq!(fx.client().len(), 3);

    fx.store.clear();
    wait_for(|| fx.client().len() == 1).await;
    assert_eq!(fx.client().keys(), vec![QueryKey::new("categories")]);

    gate.abort();
}

#[tokio::test]
async fn test_switching_users_refetches_for_the_new_user() {
    let fx = MarketFixture::signed_in("u1");
    let mut rows = listing_rows("u1", 1..=2, true);
    rows.extend(listing_rows("u2", 3..=4, true));
    fx.backend.seed(tables::PRODUCTS, rows);
    let gate = AuthGate::new(fx.client().clone(), fx.store.subscribe()).spawn();

    let feed = fx.market.published_listings(false, 8);
    feed.fetch().await.unwrap();
    let u1_key = feed.key().unwrap();
    let first: Vec<_> = feed.items().into_iter().map(|l| l.id).collect();
    assert_eq!(first, vec![4, 3]);

    fx.store.set(test_session("u2"));
    wait_for(|| !fx.client().keys().contains(&u1_key)).await;

    // The handle now resolves to u2's key, which has no data yet
    assert!(feed.items().is_empty());
    feed.fetch().await.unwrap();
    let second: Vec<_> = feed.items().into_iter().map(|l| l.id).collect();
    assert_eq!(second, vec![2, 1]);
    assert_eq!(fx.backend.calls_of(BackendOp::Select).len(), 2);

    gate.abort();
}

fn service(dir: &TempDir, auth: &MockAuthBackend) -> (AuthService, FileSessionStorage) {
    let storage = FileSessionStorage::with_path(dir.path().join("session.json"));
    let service = AuthService::new(
        Arc::new(auth.clone()),
        Arc::new(storage.clone()),
        Arc::new(SessionStore::new()),
    );
    (service, storage)
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    let auth = MockAuthBackend::new().with_account("ada@example.com", "Passw0rd!", "u1");

    let (first, _) = service(&dir, &auth);
    let session = first.sign_in("ada@example.com", "Passw0rd!").await.unwrap();

    let (second, _) = service(&dir, &auth);
    let restored = second.restore().await.unwrap();
    assert_eq!(restored, Some(session.clone()));
    assert_eq!(second.store().current(), Some(session));
    assert_eq!(auth.calls(), vec!["sign_in"]);
}

#[tokio::test]
async fn test_expired_session_is_refreshed_on_restore() {
    let dir = TempDir::new().unwrap();
    let auth = MockAuthBackend::new().with_account("ada@example.com", "Passw0rd!", "u1");
    let (service, storage) = service(&dir, &auth);
    storage.save(&expired_session("u1")).await.unwrap();

    let restored = service.restore().await.unwrap().unwrap();
    assert!(!restored.is_expired());
    assert_eq!(restored.user_id().as_str(), "u1");
    assert_eq!(storage.load().await.unwrap(), Some(restored));
}

#[tokio::test]
async fn test_unrefreshable_session_is_forgotten() {
    let dir = TempDir::new().unwrap();
    let auth = MockAuthBackend::new();
    let (service, storage) = service(&dir, &auth);
    storage.save(&expired_session("u1")).await.unwrap();
    auth.fail_next(AuthError::RefreshTokenInvalid);

    assert_eq!(service.restore().await.unwrap(), None);
    assert_eq!(storage.load().await.unwrap(), None);
    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test]
async fn test_sign_out_then_sign_in_again() {
    let dir = TempDir::new().unwrap();
    let auth = MockAuthBackend::new().with_account("ada@example.com", "Passw0rd!", "u1");
    let (service, storage) = service(&dir, &auth);

    service.sign_in("ada@example.com", "Passw0rd!").await.unwrap();
    service.sign_out().await.unwrap();
    assert_eq!(storage.load().await.unwrap(), None);
    assert!(!service.store().is_signed_in());

    assert_eq!(
        service.sign_in("ada@example.com", "wrong").await.unwrap_err(),
        AuthError::InvalidCredentials
    );
    service.sign_in("ada@example.com", "Passw0rd!").await.unwrap();
    assert!(service.store().is_signed_in());
}
