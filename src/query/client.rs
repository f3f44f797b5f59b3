//! The query cache.
//!
//! [`QueryClient`] maps [`QueryKey`]s to typed values plus fetch metadata.
//! It is the only shared mutable state of the data layer, and every write
//! goes through one of three paths:
//!
//! 1. a fetch committed with a [`FetchTicket`] whose generation still
//!    matches the slot (late responses of cancelled fetches are dropped),
//! 2. [`optimistic_update`](QueryClient::optimistic_update) /
//!    [`restore`](QueryClient::restore) around a mutation,
//! 3. whole-key invalidation or removal.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::debug;

use super::config::{QueryConfig, StaleTime};
use super::key::QueryKey;
use super::state::QueryState;
use crate::error::QueryError;

type CacheValue = Box<dyn Any + Send + Sync>;

const EVENT_CAPACITY: usize = 256;

struct Slot {
    value: Option<CacheValue>,
    error: Option<QueryError>,
    fetching: bool,
    updated_at: Option<Instant>,
    invalidated: bool,
    generation: u64,
}

impl Slot {
    fn new(generation: u64) -> Self {
        Self {
            value: None,
            error: None,
            fetching: false,
            updated_at: None,
            invalidated: false,
            generation,
        }
    }

    fn view<T: Clone + 'static>(&self) -> QueryState<T> {
        QueryState {
            data: self
                .value
                .as_ref()
                .and_then(|value| value.downcast_ref::<T>())
                .cloned(),
            error: self.error.clone(),
            is_fetching: self.fetching,
            updated_at: self.updated_at,
            is_invalidated: self.invalidated,
        }
    }
}

/// Handed out by [`QueryClient::begin_fetch`]; a fetch may only commit its
/// result while the slot's generation is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

/// Pre-mutation copies of every cached value an optimistic update touched.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    entries: Vec<(QueryKey, T)>,
}

impl<T> Snapshot<T> {
    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn get(&self, key: &QueryKey) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Inner {
    slots: RwLock<HashMap<QueryKey, Slot>>,
    config: QueryConfig,
    generations: AtomicU64,
    events: broadcast::Sender<QueryKey>,
}

/// Shared handle to the cache. Cloning is cheap and every clone sees the
/// same entries.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    pub fn new(config: QueryConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                slots: RwLock::new(HashMap::new()),
                config,
                generations: AtomicU64::new(1),
                events,
            }),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    /// Receive the key of every entry whose value or status changes.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.inner.events.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<QueryKey, Slot>> {
        self.inner.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<QueryKey, Slot>> {
        self.inner.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_generation(&self) -> u64 {
        self.inner.generations.fetch_add(1, Ordering::Relaxed)
    }

    fn notify(&self, keys: impl IntoIterator<Item = QueryKey>) {
        for key in keys {
            // No subscribers is fine.
            let _ = self.inner.events.send(key);
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get_query_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        self.read()
            .get(key)
            .and_then(|slot| slot.value.as_ref())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub fn get_query_state<T: Clone + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        self.read()
            .get(key)
            .map(Slot::view)
            .unwrap_or_else(QueryState::idle)
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.read().get(key).map(|slot| slot.fetching).unwrap_or(false)
    }

    /// Whether the entry must be (re)fetched before it can be served: it has
    /// no value, was invalidated, or has outlived `stale_time`.
    pub fn is_stale(&self, key: &QueryKey, stale_time: StaleTime) -> bool {
        let slots = self.read();
        let Some(slot) = slots.get(key) else {
            return true;
        };
        match (slot.value.is_some(), slot.updated_at) {
            (true, Some(updated_at)) => {
                slot.invalidated || stale_time.is_stale(updated_at, Instant::now())
            }
            _ => true,
        }
    }

    /// All keys currently in the cache, sorted.
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn keys_matching(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Replace the value under `key` outright, as if freshly fetched.
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        {
            let mut slots = self.write();
            let generation = self.next_generation();
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(generation));
            slot.value = Some(Box::new(value));
            slot.error = None;
            slot.updated_at = Some(Instant::now());
            slot.invalidated = false;
        }
        self.notify([key]);
    }

    /// Mark `key` as fetching and return the ticket its result must carry.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let ticket = {
            let mut slots = self.write();
            let generation = self.next_generation();
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(generation));
            slot.fetching = true;
            FetchTicket {
                key: key.clone(),
                generation: slot.generation,
            }
        };
        debug!(key = %key, "fetch started");
        self.notify([key.clone()]);
        ticket
    }

    /// Commit the outcome of a fetch.
    ///
    /// On success `build` receives the current value (if any, and if it has
    /// type `T`) and returns the new one. On failure the previous value is
    /// kept and the error recorded.
    ///
    /// Returns `Err(QueryError::Cancelled)` without touching the cache when
    /// the ticket is stale, otherwise echoes the fetch error.
    pub fn complete<T, F>(&self, ticket: FetchTicket, result: Result<F, QueryError>) -> Result<(), QueryError>
    where
        T: Send + Sync + 'static,
        F: FnOnce(Option<T>) -> T,
    {
        let outcome = {
            let mut slots = self.write();
            match slots.get_mut(&ticket.key) {
                Some(slot) if slot.generation == ticket.generation => {
                    slot.fetching = false;
                    match result {
                        Ok(build) => {
                            let previous = slot
                                .value
                                .take()
                                .and_then(|value| value.downcast::<T>().ok())
                                .map(|value| *value);
                            slot.value = Some(Box::new(build(previous)));
                            slot.error = None;
                            slot.updated_at = Some(Instant::now());
                            slot.invalidated = false;
                            Ok(())
                        }
                        Err(err) => {
                            slot.error = Some(err.clone());
                            Err(err)
                        }
                    }
                }
                _ => {
                    debug!(key = %ticket.key, "dropping response of cancelled fetch");
                    return Err(QueryError::Cancelled);
                }
            }
        };
        debug!(key = %ticket.key, ok = outcome.is_ok(), "fetch settled");
        self.notify([ticket.key]);
        outcome
    }

    /// Run `fetch` under the configured request timeout.
    pub async fn with_timeout<T, Fut>(&self, fetch: Fut) -> Result<T, QueryError>
    where
        Fut: Future<Output = Result<T, QueryError>>,
    {
        match self.inner.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| QueryError::Timeout(limit))?,
            None => fetch.await,
        }
    }

    /// Fetch and store a plain (non-paginated) value under `key`.
    pub async fn fetch<T, Fut>(&self, key: &QueryKey, fetch: Fut) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let ticket = self.begin_fetch(key);
        let result = self.with_timeout(fetch).await;
        self.complete(ticket, result.clone().map(|value| move |_: Option<T>| value))?;
        result
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Abandon in-flight fetches under `prefix`. Their responses will be
    /// dropped when they arrive. Returns how many fetches were cancelled.
    pub fn cancel_queries(&self, prefix: &QueryKey) -> usize {
        let cancelled: Vec<QueryKey> = {
            let mut slots = self.write();
            slots
                .iter_mut()
                .filter(|(key, slot)| slot.fetching && key.starts_with(prefix))
                .map(|(key, slot)| {
                    slot.generation = self.next_generation();
                    slot.fetching = false;
                    key.clone()
                })
                .collect()
        };
        if !cancelled.is_empty() {
            debug!(prefix = %prefix, count = cancelled.len(), "cancelled in-flight fetches");
        }
        let count = cancelled.len();
        self.notify(cancelled);
        count
    }

    /// Mark entries under `prefix` stale so the next read refetches them.
    pub fn invalidate_queries(&self, prefix: &QueryKey) -> usize {
        let touched: Vec<QueryKey> = {
            let mut slots = self.write();
            slots
                .iter_mut()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, slot)| {
                    slot.invalidated = true;
                    key.clone()
                })
                .collect()
        };
        debug!(prefix = %prefix, count = touched.len(), "invalidated");
        let count = touched.len();
        self.notify(touched);
        count
    }

    pub fn remove_queries(&self, prefix: &QueryKey) -> usize {
        self.remove_where(|key| key.starts_with(prefix))
    }

    /// Drop every entry whose key satisfies `pred`. In-flight fetches for
    /// removed entries can no longer commit.
    pub fn remove_where<F>(&self, pred: F) -> usize
    where
        F: Fn(&QueryKey) -> bool,
    {
        let removed: Vec<QueryKey> = {
            let mut slots = self.write();
            let doomed: Vec<QueryKey> = slots.keys().filter(|key| pred(key)).cloned().collect();
            for key in &doomed {
                slots.remove(key);
            }
            doomed
        };
        if !removed.is_empty() {
            debug!(count = removed.len(), "removed cache entries");
        }
        let count = removed.len();
        self.notify(removed);
        count
    }

    /// Drop idle entries not refreshed within `cache_time`.
    pub fn garbage_collect(&self, cache_time: Duration) -> usize {
        let now = Instant::now();
        self.remove_where_slot(|slot| {
            !slot.fetching
                && slot
                    .updated_at
                    .map(|at| now.saturating_duration_since(at) >= cache_time)
                    .unwrap_or(true)
        })
    }

    fn remove_where_slot<F>(&self, pred: F) -> usize
    where
        F: Fn(&Slot) -> bool,
    {
        let mut slots = self.write();
        let before = slots.len();
        slots.retain(|_, slot| !pred(slot));
        before - slots.len()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    // ------------------------------------------------------------------
    // Optimistic updates
    // ------------------------------------------------------------------

    /// Cancel in-flight fetches under `prefixes`, then copy and edit in
    /// place every `T` value stored there. All of it happens under one write
    /// lock, so no fetch can start or commit between the cancel and the
    /// edit, and no reader sees the cache between the copy and the edit.
    ///
    /// Entries without a value, or holding a different type, are neither
    /// copied nor edited.
    pub fn optimistic_update<T, F>(&self, prefixes: &[QueryKey], mut apply: F) -> Snapshot<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut(&mut T),
    {
        let (snapshot, cancelled) = {
            let mut slots = self.write();
            let mut entries = Vec::new();
            let mut cancelled = Vec::new();
            for (key, slot) in slots.iter_mut() {
                if !prefixes.iter().any(|prefix| key.starts_with(prefix)) {
                    continue;
                }
                if slot.fetching {
                    slot.generation = self.next_generation();
                    slot.fetching = false;
                    cancelled.push(key.clone());
                }
                if let Some(value) = slot.value.as_mut().and_then(|v| v.downcast_mut::<T>()) {
                    entries.push((key.clone(), value.clone()));
                    apply(value);
                }
            }
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            (Snapshot { entries }, cancelled)
        };
        if !cancelled.is_empty() {
            debug!(count = cancelled.len(), "cancelled in-flight fetches before optimistic edit");
        }
        let mut touched: Vec<QueryKey> = snapshot.keys().cloned().collect();
        touched.extend(cancelled.into_iter().filter(|key| snapshot.get(key).is_none()));
        self.notify(touched);
        snapshot
    }

    /// Put back exactly the values captured in `snapshot`. Returns the
    /// number of keys restored.
    pub fn restore<T: Send + Sync + 'static>(&self, snapshot: Snapshot<T>) -> usize {
        let restored: Vec<QueryKey> = {
            let mut slots = self.write();
            snapshot
                .entries
                .into_iter()
                .map(|(key, value)| {
                    let generation = self.next_generation();
                    let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(generation));
                    slot.value = Some(Box::new(value));
                    key
                })
                .collect()
        };
        let count = restored.len();
        self.notify(restored);
        count
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::InfiniteData;

    fn key(parts: &[&str]) -> QueryKey {
        let mut key = QueryKey::new(parts[0]);
        for part in &parts[1..] {
            key = key.with(*part);
        }
        key
    }

    #[test]
    fn test_set_and_get_typed() {
        let client = QueryClient::default();
        let k = key(&["categories"]);
        client.set_query_data(k.clone(), vec!["bikes".to_string()]);

        assert_eq!(client.get_query_data::<Vec<String>>(&k), Some(vec!["bikes".to_string()]));
        assert_eq!(client.get_query_data::<Vec<i64>>(&k), None);
        assert!(!client.is_stale(&k, StaleTime::Never));
    }

    #[test]
    fn test_missing_entry_is_stale_and_idle() {
        let client = QueryClient::default();
        let k = key(&["profile"]);
        assert!(client.is_stale(&k, StaleTime::Never));
        let state = client.get_query_state::<i32>(&k);
        assert!(!state.is_loading());
        assert!(state.data.is_none());
    }

    #[test]
    fn test_stale_ticket_is_dropped() {
        let client = QueryClient::default();
        let k = key(&["listings", "draft"]);
        client.set_query_data(k.clone(), 1);

        let ticket = client.begin_fetch(&k);
        assert!(client.is_fetching(&k));
        assert_eq!(client.cancel_queries(&key(&["listings"])), 1);
        assert!(!client.is_fetching(&k));

        let result = client.complete(ticket, Ok(|_: Option<i32>| 99));
        assert_eq!(result, Err(QueryError::Cancelled));
        assert_eq!(client.get_query_data::<i32>(&k), Some(1));
    }

    #[test]
    fn test_ticket_from_removed_slot_cannot_commit() {
        let client = QueryClient::default();
        let k = key(&["listing"]);
        let old = client.begin_fetch(&k);
        client.remove_queries(&k);
        let _fresh = client.begin_fetch(&k);

        assert_eq!(client.complete(old, Ok(|_: Option<i32>| 5)), Err(QueryError::Cancelled));
        assert_eq!(client.get_query_data::<i32>(&k), None);
    }

    #[test]
    fn test_failed_fetch_keeps_previous_value() {
        let client = QueryClient::default();
        let k = key(&["categories"]);
        client.set_query_data(k.clone(), 7);

        let ticket = client.begin_fetch(&k);
        let err = QueryError::NotFound { resource: "categories".to_string() };
        assert_eq!(
            client.complete::<i32, fn(Option<i32>) -> i32>(ticket, Err(err.clone())),
            Err(err)
        );

        let state = client.get_query_state::<i32>(&k);
        assert_eq!(state.data, Some(7));
        assert!(state.is_error());
        assert!(!state.is_fetching);
    }

    #[test]
    fn test_complete_builds_from_previous() {
        let client = QueryClient::default();
        let k = key(&["listings"]);
        client.set_query_data(k.clone(), InfiniteData::from_pages(vec![vec![1, 2]], 2));

        let ticket = client.begin_fetch(&k);
        client
            .complete(ticket, Ok(|prev: Option<InfiniteData<i32>>| {
                let mut data = prev.unwrap_or_else(|| InfiniteData::new(2));
                data.push_page(vec![3]);
                data
            }))
            .unwrap();

        let data = client.get_query_data::<InfiniteData<i32>>(&k).unwrap();
        assert_eq!(data.flatten(), vec![1, 2, 3]);
    }

    #[test]
    fn test_invalidate_marks_stale() {
        let client = QueryClient::default();
        client.set_query_data(key(&["profile", "a"]), 1);
        client.set_query_data(key(&["profile", "b"]), 2);
        client.set_query_data(key(&["categories"]), 3);

        assert_eq!(client.invalidate_queries(&key(&["profile"])), 2);
        assert!(client.is_stale(&key(&["profile", "a"]), StaleTime::Never));
        assert!(!client.is_stale(&key(&["categories"]), StaleTime::Never));
        assert_eq!(client.get_query_data::<i32>(&key(&["profile", "a"])), Some(1));
    }

    #[test]
    fn test_garbage_collect() {
        let client = QueryClient::default();
        client.set_query_data(key(&["categories"]), 1);
        assert_eq!(client.garbage_collect(Duration::from_secs(60)), 0);
        assert_eq!(client.garbage_collect(Duration::ZERO), 1);
        assert!(client.is_empty());
    }

    #[test]
    fn test_optimistic_snapshot_and_restore_are_symmetric() {
        let client = QueryClient::default();
        let drafts = key(&["listings", "draft"]);
        let feed = key(&["listings", "published"]);
        let other_type = key(&["listings", "count"]);
        client.set_query_data(drafts.clone(), InfiniteData::from_pages(vec![vec![3, 5], vec![7]], 2));
        client.set_query_data(feed.clone(), InfiniteData::from_pages(vec![vec![5, 9]], 2));
        client.set_query_data(other_type.clone(), 12usize);
        client.set_query_data(key(&["profile"]), InfiniteData::from_pages(vec![vec![5]], 2));

        let snapshot = client.optimistic_update::<InfiniteData<i32>, _>(
            &[key(&["listings"])],
            |data| {
                data.remove_where(|x| *x == 5);
            },
        );

        let snapshot_keys: Vec<QueryKey> = snapshot.keys().cloned().collect();
        assert_eq!(snapshot_keys, vec![drafts.clone(), feed.clone()]);
        assert_eq!(
            client.get_query_data::<InfiniteData<i32>>(&drafts).unwrap().pages(),
            &[vec![3], vec![7]]
        );

        assert_eq!(client.restore(snapshot), 2);
        assert_eq!(
            client.get_query_data::<InfiniteData<i32>>(&drafts).unwrap().pages(),
            &[vec![3, 5], vec![7]]
        );
        assert_eq!(
            client.get_query_data::<InfiniteData<i32>>(&feed).unwrap().flatten(),
            vec![5, 9]
        );
        assert_eq!(
            client.get_query_data::<InfiniteData<i32>>(&key(&["profile"])).unwrap().flatten(),
            vec![5]
        );
    }

    #[test]
    fn test_optimistic_update_cancels_fetches_in_scope() {
        let client = QueryClient::default();
        let drafts = key(&["listings", "draft"]);
        let pending = key(&["listings", "published"]);
        let profile = key(&["profile"]);
        client.set_query_data(drafts.clone(), InfiniteData::from_pages(vec![vec![3, 5]], 2));

        let drafts_ticket = client.begin_fetch(&drafts);
        let pending_ticket = client.begin_fetch(&pending);
        let profile_ticket = client.begin_fetch(&profile);
        client.optimistic_update::<InfiniteData<i32>, _>(&[key(&["listings"])], |data| {
            data.remove_where(|x| *x == 5);
        });
        assert!(!client.is_fetching(&drafts));
        assert!(!client.is_fetching(&pending));

        let late = client.complete(drafts_ticket, Ok(|_: Option<InfiniteData<i32>>| {
            InfiniteData::from_pages(vec![vec![3, 5]], 2)
        }));
        assert_eq!(late, Err(QueryError::Cancelled));
        assert_eq!(
            client.get_query_data::<InfiniteData<i32>>(&drafts).unwrap().flatten(),
            vec![3]
        );
        assert_eq!(
            client.complete(pending_ticket, Ok(|_: Option<i32>| 1)),
            Err(QueryError::Cancelled)
        );
        assert_eq!(client.complete(profile_ticket, Ok(|_: Option<i32>| 1)), Ok(()));
    }

    #[tokio::test]
    async fn test_fetch_stores_value() {
        let client = QueryClient::default();
        let k = key(&["categories"]);
        let value = client.fetch(&k, async { Ok::<_, QueryError>(vec![1, 2]) }).await.unwrap();
        assert_eq!(value, vec![1, 2]);
        assert_eq!(client.get_query_data::<Vec<i32>>(&k), Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let client = QueryClient::new(QueryConfig::new().with_request_timeout(Duration::from_millis(10)));
        let k = key(&["categories"]);
        let err = client
            .fetch(&k, async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<i32, QueryError>(1)
            })
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::Timeout(Duration::from_millis(10)));
        assert!(client.get_query_state::<i32>(&k).is_error());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let client = QueryClient::default();
        let mut events = client.subscribe();
        client.set_query_data(key(&["categories"]), 1);
        assert_eq!(events.recv().await.unwrap(), key(&["categories"]));
    }
}
