//! Paginated ("infinite") queries.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::client::QueryClient;
use super::config::StaleTime;
use super::gate::QueryGate;
use super::key::QueryKey;
use super::page::InfiniteData;
use super::range::PageCursor;
use super::state::QueryState;
use crate::error::QueryError;
use crate::traits::Backend;

/// A filtered, ordered collection fetched page by page.
#[async_trait]
pub trait PagedQuery: Clone + PartialEq + Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    fn key(&self) -> QueryKey;

    fn limit(&self) -> usize;

    async fn fetch_page(
        &self,
        backend: &dyn Backend,
        cursor: PageCursor,
    ) -> Result<Vec<Self::Item>, QueryError>;
}

/// Consumer handle for one paginated collection.
///
/// The pages themselves live in the [`QueryClient`], so any number of
/// handles for the same key share them.
pub struct InfiniteQuery<Q: PagedQuery> {
    client: QueryClient,
    backend: Arc<dyn Backend>,
    gate: QueryGate<Q>,
    stale_time: StaleTime,
}

impl<Q: PagedQuery> Clone for InfiniteQuery<Q> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            backend: Arc::clone(&self.backend),
            gate: self.gate.clone(),
            stale_time: self.stale_time,
        }
    }
}

impl<Q: PagedQuery> InfiniteQuery<Q> {
    pub fn new(client: QueryClient, backend: Arc<dyn Backend>, gate: QueryGate<Q>) -> Self {
        let stale_time = client.config().stale_time;
        Self {
            client,
            backend,
            gate,
            stale_time,
        }
    }

    pub fn with_stale_time(mut self, stale_time: StaleTime) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn query(&self) -> Option<Q> {
        self.gate.current()
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    pub fn key(&self) -> Option<QueryKey> {
        self.query().map(|query| query.key())
    }

    pub fn state(&self) -> QueryState<InfiniteData<Q::Item>> {
        match self.key() {
            Some(key) => self.client.get_query_state(&key),
            None => QueryState::idle(),
        }
    }

    /// Every item fetched so far, flattened in page order.
    pub fn items(&self) -> Vec<Q::Item> {
        self.state().data.map(|data| data.flatten()).unwrap_or_default()
    }

    pub fn has_next_page(&self) -> bool {
        self.state()
            .data
            .map(|data| data.has_next_page())
            .unwrap_or(false)
    }

    /// Serve the cached pages when fresh, otherwise load them. A disabled
    /// query does nothing and yields `None`.
    pub async fn fetch(&self) -> Result<Option<InfiniteData<Q::Item>>, QueryError> {
        let Some(query) = self.gate.current() else {
            return Ok(None);
        };
        let key = query.key();
        if !self.client.is_stale(&key, self.stale_time) {
            debug!(key = %key, "serving cached pages");
            return Ok(self.client.get_query_data(&key));
        }
        self.reload(&query).await.map(Some)
    }

    /// Append the page after the last one fetched.
    ///
    /// Returns `false` without a request when the query is disabled or the
    /// last page was short. Callers must not overlap calls for one key.
    pub async fn fetch_next_page(&self) -> Result<bool, QueryError> {
        let Some(query) = self.gate.current() else {
            return Ok(false);
        };
        let key = query.key();
        let Some(data) = self.client.get_query_data::<InfiniteData<Q::Item>>(&key) else {
            self.reload(&query).await?;
            return Ok(true);
        };
        let Some(cursor) = data.next_cursor() else {
            return Ok(false);
        };

        let limit = query.limit();
        let ticket = self.client.begin_fetch(&key);
        let page = self
            .client
            .with_timeout(query.fetch_page(self.backend.as_ref(), cursor))
            .await;
        debug!(key = %key, cursor, "fetched next page");
        self.client.complete(
            ticket,
            page.map(|page| {
                move |previous: Option<InfiniteData<Q::Item>>| {
                    let mut data = previous.unwrap_or_else(|| InfiniteData::new(limit));
                    data.push_page(page);
                    data
                }
            }),
        )?;
        Ok(true)
    }

    /// Refetch every page loaded so far, ignoring freshness.
    pub async fn refetch(&self) -> Result<(), QueryError> {
        match self.gate.current() {
            Some(query) => self.reload(&query).await.map(|_| ()),
            None => Ok(()),
        }
    }

    /// Fetch whenever the session enables this query or changes its key,
    /// until the session source is dropped.
    pub async fn follow_session(&self) {
        self.gate
            .for_each_enabled(|query| async move {
                if let Err(err) = self.fetch().await {
                    warn!(key = %query.key(), error = %err, "fetch after session change failed");
                }
            })
            .await
    }

    /// Fetch pages `0..n` from scratch, where `n` is the number of pages
    /// already cached (at least one). Stops early on a short page. The
    /// cached pages are replaced only when every page succeeded.
    async fn reload(&self, query: &Q) -> Result<InfiniteData<Q::Item>, QueryError> {
        let key = query.key();
        let limit = query.limit();
        let wanted = self
            .client
            .get_query_data::<InfiniteData<Q::Item>>(&key)
            .map(|data| data.page_count())
            .unwrap_or(0)
            .max(1);

        let ticket = self.client.begin_fetch(&key);
        let backend = self.backend.as_ref();
        let pages = self
            .client
            .with_timeout(async {
                let mut pages = Vec::with_capacity(wanted);
                for cursor in 0..wanted {
                    let page = query.fetch_page(backend, cursor).await?;
                    let short = page.len() < limit;
                    pages.push(page);
                    if short {
                        break;
                    }
                }
                Ok(pages)
            })
            .await;

        let data = pages.map(|pages| InfiniteData::from_pages(pages, limit));
        debug!(key = %key, pages = data.as_ref().map(|d| d.page_count()).ok(), "reloaded");
        let result = data.clone();
        self.client.complete(ticket, data.map(|data| move |_: Option<InfiniteData<Q::Item>>| data))?;
        result
    }
}
