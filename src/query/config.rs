//! Cache timing configuration.

use std::time::{Duration, Instant};

/// How long a successfully fetched value counts as fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleTime {
    After(Duration),
    /// Never stale by age; only explicit invalidation or refetch replaces it.
    Never,
}

impl StaleTime {
    pub fn is_stale(&self, updated_at: Instant, now: Instant) -> bool {
        match self {
            StaleTime::After(duration) => now.saturating_duration_since(updated_at) >= *duration,
            StaleTime::Never => false,
        }
    }
}

impl Default for StaleTime {
    fn default() -> Self {
        StaleTime::After(QueryConfig::DEFAULT_STALE_TIME)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    pub stale_time: StaleTime,
    /// Unused entries older than this are dropped by garbage collection.
    pub cache_time: Duration,
    /// Upper bound on a single backend call. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl QueryConfig {
    pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(10 * 60);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stale_time(mut self, stale_time: StaleTime) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: StaleTime::default(),
            cache_time: Self::DEFAULT_CACHE_TIME,
            request_timeout: None,
        }
    }
}
