//! Client-side query cache.
//!
//! Sits between consumers and the [`Backend`](crate::traits::Backend):
//!
//! - [`QueryKey`] - structural cache keys with prefix matching
//! - [`range_for`] - page cursor to row range
//! - [`InfiniteData`] - pages of a paginated collection
//! - [`QueryClient`] - the cache itself: typed entries, fetch generations,
//!   invalidation, snapshots
//! - [`InfiniteQuery`] / [`EntityQuery`] - consumer handles for paginated
//!   and single-record queries, gated on the session by [`QueryGate`]
//! - [`Mutation`] and [`optimistic`] - writes with observable state and
//!   rollback on failure

mod client;
mod config;
mod entity;
mod gate;
mod infinite;
mod key;
mod mutation;
mod page;
mod range;
mod state;

pub use client::{FetchTicket, QueryClient, Snapshot};
pub use config::{QueryConfig, StaleTime};
pub use entity::{EntityQuery, SingleQuery};
pub use gate::QueryGate;
pub use infinite::{InfiniteQuery, PagedQuery};
pub use key::{key_for, KeyPart, QueryKey};
pub use mutation::{optimistic, Mutation};
pub use page::{next_cursor, InfiniteData};
pub use range::{range_for, PageCursor, RowRange};
pub use state::{MutationState, QueryState};
