//! Declarative query handles over the shared cache.
//!
//! A `CachedQuery<T>` binds a cache key to a fetcher closure. Creating and
//! polling one from a view gives the usual lifecycle: cached data is served
//! immediately, stale data re-validates in the background, and concurrent
//! handles on the same key share a single network request.
//!
//! # Example
//!
//! ```ignore
//! let api = ctx.api.clone();
//! let mut query = CachedQuery::new(&ctx.cache, QueryKey::collection("movies"), move || {
//!     let api = api.clone();
//!     async move { api.movies().await }
//! });
//! query.fetch();
//!
//! // In the tick handler
//! query.poll();
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};

use crate::api::ApiError;

use super::cache::QueryCache;
use super::key::QueryKey;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// First fetch is running and there is no cached data yet
  Loading,
  /// Data is available (possibly re-validating in the background)
  Success(T),
  /// The last fetch failed and there is no data to show
  Error(String),
}

impl<T> QueryState<T> {
  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// A query handle bound to one cache key.
pub struct CachedQuery<T> {
  cache: QueryCache,
  key: QueryKey,
  fetcher: FetcherFn<T>,
  state: QueryState<T>,
  /// Last entry version folded into `state`
  seen: u64,
  /// Age after which cached data re-validates on `fetch`; `None` means never
  stale_time: Option<Duration>,
  /// Auto-refetch period for polling screens
  refetch_interval: Option<Duration>,
}

impl<T> CachedQuery<T>
where
  T: Clone + Serialize + DeserializeOwned + Send + 'static,
{
  pub fn new<F, Fut>(cache: &QueryCache, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      cache: cache.clone(),
      key,
      fetcher: Box::new(move || Box::pin(fetcher())),
      state: QueryState::Idle,
      seen: 0,
      stale_time: Some(Duration::zero()),
      refetch_interval: None,
    }
  }

  /// Set the stale time. `None` means cached data never goes stale by age.
  pub fn with_stale_time(mut self, stale_time: Option<Duration>) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Enable auto-refetching at the given period.
  pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
    self.refetch_interval = Some(interval);
    self
  }

  /// Adjust the auto-refetch period at runtime.
  pub fn set_refetch_interval(&mut self, interval: Duration) {
    self.refetch_interval = Some(interval);
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// True while the first fetch runs and nothing is cached
  pub fn is_loading(&self) -> bool {
    matches!(self.state, QueryState::Loading)
  }

  /// True whenever a fetch for this key is in flight, including background
  /// re-validation while data is on screen
  pub fn is_fetching(&self) -> bool {
    self
      .cache
      .meta(&self.key)
      .map(|meta| meta.in_flight)
      .unwrap_or(false)
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// When the cached value was last confirmed by the server
  pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
    self.cache.meta(&self.key).and_then(|meta| meta.fetched_at)
  }

  /// Start the query: serve any cached value immediately and re-validate it
  /// in the background when stale.
  pub fn fetch(&mut self) {
    let meta = self.cache.meta(&self.key);

    if let Some(value) = self.cache.read::<T>(&self.key) {
      self.state = QueryState::Success(value);
      self.seen = meta.as_ref().map(|m| m.version).unwrap_or(0);
      if self.is_stale(meta.as_ref()) {
        self.spawn_fetch();
      }
      return;
    }

    self.state = QueryState::Loading;
    self.spawn_fetch();
  }

  /// Force a fresh fetch, abandoning any in-flight one.
  pub fn refetch(&mut self) {
    self.cache.cancel_in_flight(&self.key);
    if self.data().is_none() {
      self.state = QueryState::Loading;
    }
    self.spawn_fetch();
  }

  /// Fold cache changes into the handle's state and drive background
  /// re-validation. Returns `true` when the state changed. Call on each tick.
  pub fn poll(&mut self) -> bool {
    let Some(meta) = self.cache.meta(&self.key) else {
      // Entry was evicted under us (e.g. after a delete); fetch fresh data
      // but keep showing what we have until it arrives.
      self.spawn_fetch();
      return false;
    };

    let mut changed = false;
    if meta.version != self.seen {
      self.seen = meta.version;
      if let Some(value) = self.cache.read::<T>(&self.key) {
        self.state = QueryState::Success(value);
      } else if let Some(error) = meta.error.clone() {
        self.state = QueryState::Error(error);
      }
      changed = true;
    }

    // An entry marked stale re-validates on the next tick that observes it
    if meta.stale && meta.has_value && !meta.in_flight {
      self.spawn_fetch();
    }

    if let Some(interval) = self.refetch_interval {
      let due = match meta.fetched_at {
        Some(at) => Utc::now() - at >= interval,
        None => false,
      };
      if due && !meta.in_flight {
        self.spawn_fetch();
      }
    }

    changed
  }

  fn is_stale(&self, meta: Option<&super::cache::EntryMeta>) -> bool {
    let Some(meta) = meta else { return true };
    if meta.stale {
      return true;
    }
    match (self.stale_time, meta.fetched_at) {
      (Some(stale_time), Some(at)) => Utc::now() - at >= stale_time,
      (Some(_), None) => true,
      (None, _) => false,
    }
  }

  fn spawn_fetch(&self) {
    // Coalesce: only the first handle to ask actually hits the network
    let Some(ticket) = self.cache.begin_fetch(&self.key) else {
      return;
    };
    let cache = self.cache.clone();
    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      cache.complete_fetch(ticket, result);
    });
  }
}

/// Warm the cache for `key` ahead of navigation. A no-op when the key
/// already holds a value or a fetch is in flight.
pub fn prefetch<T, F, Fut>(cache: &QueryCache, key: QueryKey, fetcher: F)
where
  T: Serialize + Send + 'static,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
  if cache.contains(&key) {
    return;
  }
  let Some(ticket) = cache.begin_fetch(&key) else {
    return;
  };
  let cache = cache.clone();
  let future = fetcher();
  tokio::spawn(async move {
    let result = future.await;
    cache.complete_fetch(ticket, result);
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration as StdDuration;

  fn key() -> QueryKey {
    QueryKey::collection("tracks")
  }

  async fn settle() {
    tokio::time::sleep(StdDuration::from_millis(20)).await;
  }

  #[tokio::test]
  async fn test_fetch_success() {
    let cache = QueryCache::new();
    let mut query = CachedQuery::new(&cache, key(), || async { Ok(vec![1u64, 2, 3]) });

    query.fetch();
    assert!(query.is_loading());

    settle().await;
    assert!(query.poll());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_fetch_error() {
    let cache = QueryCache::new();
    let mut query: CachedQuery<Vec<u64>> =
      CachedQuery::new(&cache, key(), || async { Err(ApiError::Timeout) });

    query.fetch();
    settle().await;

    assert!(query.poll());
    assert_eq!(query.error(), Some("request timed out"));
  }

  #[tokio::test]
  async fn test_serves_cached_value_immediately() {
    let cache = QueryCache::new();
    cache.write(&key(), &vec![7u64]);

    let mut query = CachedQuery::new(&cache, key(), || async { Ok(vec![8u64]) })
      .with_stale_time(None);

    query.fetch();
    // No await needed: the cached value is the state right away
    assert_eq!(query.data(), Some(&vec![7]));

    settle().await;
    query.poll();
    // stale_time None means no background re-validation happened
    assert_eq!(query.data(), Some(&vec![7]));
  }

  #[tokio::test]
  async fn test_stale_cached_value_revalidates_in_background() {
    let cache = QueryCache::new();
    cache.write(&key(), &vec![7u64]);

    // Default stale time is zero: cached data shows instantly, then updates
    let mut query = CachedQuery::new(&cache, key(), || async { Ok(vec![8u64]) });
    query.fetch();
    assert_eq!(query.data(), Some(&vec![7]));

    settle().await;
    assert!(query.poll());
    assert_eq!(query.data(), Some(&vec![8]));
  }

  #[tokio::test]
  async fn test_concurrent_handles_share_one_request() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let make = |cache: &QueryCache, calls: Arc<AtomicU32>| {
      CachedQuery::new(cache, key(), move || {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(StdDuration::from_millis(10)).await;
          Ok(vec![1u64])
        }
      })
    };

    let mut left = make(&cache, calls.clone());
    let mut right = make(&cache, calls.clone());

    left.fetch();
    right.fetch();
    settle().await;

    left.poll();
    right.poll();
    assert_eq!(left.data(), Some(&vec![1]));
    assert_eq!(right.data(), Some(&vec![1]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_mark_stale_triggers_revalidation_on_poll() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let fetch_calls = calls.clone();

    let mut query = CachedQuery::new(&cache, key(), move || {
      let calls = fetch_calls.clone();
      async move {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![u64::from(n)])
      }
    });

    query.fetch();
    settle().await;
    query.poll();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.mark_stale(&key());
    query.poll();
    settle().await;
    query.poll();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(query.data(), Some(&vec![1]));
  }

  #[tokio::test]
  async fn test_refetch_interval_polls() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let fetch_calls = calls.clone();

    let mut query = CachedQuery::new(&cache, key(), move || {
      let calls = fetch_calls.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1u64])
      }
    })
    .with_refetch_interval(Duration::milliseconds(30));

    query.fetch();
    for _ in 0..6 {
      settle().await;
      query.poll();
    }

    assert!(calls.load(Ordering::SeqCst) >= 2);
  }

  #[tokio::test]
  async fn test_prefetch_warms_key_once() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
      let calls = calls.clone();
      prefetch(&cache, key(), move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1u64])
      });
    }
    settle().await;

    assert!(cache.contains(&key()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Warm key: further prefetches are no-ops
    let calls_after = calls.clone();
    prefetch(&cache, key(), move || async move {
      calls_after.fetch_add(1, Ordering::SeqCst);
      Ok(vec![2u64])
    });
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
