//! Single-record queries.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::client::QueryClient;
use super::config::StaleTime;
use super::gate::QueryGate;
use super::key::QueryKey;
use super::state::QueryState;
use crate::error::QueryError;
use crate::traits::Backend;

/// One value cached under its own key.
#[async_trait]
pub trait SingleQuery: Clone + PartialEq + Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    fn key(&self) -> QueryKey;

    async fn fetch(&self, backend: &dyn Backend) -> Result<Self::Output, QueryError>;
}

/// Consumer handle for one single-record query.
pub struct EntityQuery<Q: SingleQuery> {
    client: QueryClient,
    backend: Arc<dyn Backend>,
    gate: QueryGate<Q>,
    stale_time: StaleTime,
}

impl<Q: SingleQuery> Clone for EntityQuery<Q> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            backend: Arc::clone(&self.backend),
            gate: self.gate.clone(),
            stale_time: self.stale_time,
        }
    }
}

impl<Q: SingleQuery> EntityQuery<Q> {
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

    /// Keep the cached value until it is invalidated or explicitly
    /// refetched.
    pub fn non_stale(self) -> Self {
        self.with_stale_time(StaleTime::Never)
    }

    pub fn stale_time(&self) -> StaleTime {
        self.stale_time
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    pub fn key(&self) -> Option<QueryKey> {
        self.gate.current().map(|query| query.key())
    }

    pub fn state(&self) -> QueryState<Q::Output> {
        match self.key() {
            Some(key) => self.client.get_query_state(&key),
            None => QueryState::idle(),
        }
    }

    pub fn data(&self) -> Option<Q::Output> {
        self.state().data
    }

    /// Serve the cached value when fresh, otherwise fetch it. A disabled
    /// query does nothing and yields `None`.
    pub async fn fetch(&self) -> Result<Option<Q::Output>, QueryError> {
        let Some(query) = self.gate.current() else {
            return Ok(None);
        };
        let key = query.key();
        if !self.client.is_stale(&key, self.stale_time) {
            debug!(key = %key, "serving cached value");
            return Ok(self.client.get_query_data(&key));
        }
        self.load(&query).await.map(Some)
    }

    /// Fetch regardless of freshness.
    pub async fn refetch(&self) -> Result<Option<Q::Output>, QueryError> {
        match self.gate.current() {
            Some(query) => self.load(&query).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn follow_session(&self) {
        self.gate
            .for_each_enabled(|query| async move {
                if let Err(err) = self.fetch().await {
                    warn!(key = %query.key(), error = %err, "fetch after session change failed");
                }
            })
            .await
    }

    async fn load(&self, query: &Q) -> Result<Q::Output, QueryError> {
        self.client
            .fetch(&query.key(), query.fetch(self.backend.as_ref()))
            .await
    }
}
