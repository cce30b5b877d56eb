//! Declarative data synchronization over a key-addressed cache.
//!
//! The pieces, bottom up:
//! - [`key::QueryKey`] addresses cache entries (collection, item, page, feed),
//! - [`cache::QueryCache`] is the shared store: versioned entries, staleness
//!   flags, and fetch admission with epoch-checked cancellation,
//! - [`handle::CachedQuery`] is the per-view read handle (serve cached,
//!   re-validate stale, coalesce in-flight requests, optional polling),
//! - [`infinite::InfiniteQuery`] accumulates a bounded window of pages,
//! - [`mutation`] holds the speculative delete flow and the mutation handle.

mod cache;
mod handle;
mod infinite;
mod key;
mod mutation;

pub use cache::{EntryMeta, FetchTicket, QueryCache};
pub use handle::{prefetch, CachedQuery, QueryState};
pub use infinite::InfiniteQuery;
pub use key::QueryKey;
pub use mutation::{delete_with_rollback, Mutation, MutationState};
