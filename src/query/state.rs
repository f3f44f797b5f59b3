//! What consumers see of a query or mutation.

use std::time::Instant;

use crate::error::QueryError;

/// Point-in-time view of one cache slot.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub error: Option<QueryError>,
    pub is_fetching: bool,
    pub updated_at: Option<Instant>,
    pub is_invalidated: bool,
}

impl<T> QueryState<T> {
    /// State of a query that is disabled or has never run.
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            is_fetching: false,
            updated_at: None,
            is_invalidated: false,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// First load in flight: fetching with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.is_fetching && self.data.is_none()
    }

    /// Background refetch of data that is already shown.
    pub fn is_refetching(&self) -> bool {
        self.is_fetching && self.data.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(QueryError::user_message)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> QueryState<U> {
        QueryState {
            data: self.data.map(f),
            error: self.error,
            is_fetching: self.is_fetching,
            updated_at: self.updated_at,
            is_invalidated: self.is_invalidated,
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

/// Lifecycle of one mutation handle.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<T> {
    Idle,
    Pending,
    Success(T),
    Error(QueryError),
}

impl<T> MutationState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            MutationState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&QueryError> {
        match self {
            MutationState::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, MutationState::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MutationState::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MutationState::Error(_))
    }
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        MutationState::Idle
    }
}
