//! Infinite queries: a bounded window of pages accumulated under a feed key.

use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};

use crate::api::ApiError;
use crate::models::CommodityPage;

use super::cache::QueryCache;
use super::handle::QueryState;
use super::key::QueryKey;

/// A page that links to its neighbours by page number.
pub trait Paged: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  fn prev_page(&self) -> Option<u32>;
  fn next_page(&self) -> Option<u32>;
}

impl Paged for CommodityPage {
  fn prev_page(&self) -> Option<u32> {
    self.prev
  }

  fn next_page(&self) -> Option<u32> {
    self.next
  }
}

/// Which end of the window a fetch extends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchDirection {
  Forward,
  Backward,
}

type PageFetcher<P> = Box<dyn Fn(u32) -> BoxFuture<'static, Result<P, ApiError>> + Send + Sync>;

/// Query handle accumulating pages under a feed key.
///
/// At most `max_pages` pages are retained: loading past the window drops
/// pages from the far end, and they can be re-loaded by scrolling back
/// (`fetch_previous`). This keeps a feed of unbounded length at a bounded
/// memory cost.
pub struct InfiniteQuery<P: Paged> {
  cache: QueryCache,
  key: QueryKey,
  fetcher: PageFetcher<P>,
  state: QueryState<Vec<P>>,
  seen: u64,
  pending: Option<FetchDirection>,
  first_page: u32,
  max_pages: usize,
}

impl<P: Paged> InfiniteQuery<P> {
  pub fn new<F, Fut>(
    cache: &QueryCache,
    key: QueryKey,
    first_page: u32,
    max_pages: usize,
    fetcher: F,
  ) -> Self
  where
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<P, ApiError>> + Send + 'static,
  {
    Self {
      cache: cache.clone(),
      key,
      fetcher: Box::new(move |page| Box::pin(fetcher(page))),
      state: QueryState::Idle,
      seen: 0,
      pending: None,
      first_page,
      max_pages: max_pages.max(1),
    }
  }

  pub fn pages(&self) -> &[P] {
    self.state.data().map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, QueryState::Loading)
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  pub fn has_next(&self) -> bool {
    self.pages().last().map_or(false, |p| p.next_page().is_some())
  }

  /// True when pages before the window were trimmed (or exist upstream)
  pub fn has_previous(&self) -> bool {
    self.pages().first().map_or(false, |p| p.prev_page().is_some())
  }

  pub fn is_fetching_next(&self) -> bool {
    self.pending == Some(FetchDirection::Forward) && self.in_flight()
  }

  pub fn is_fetching_previous(&self) -> bool {
    self.pending == Some(FetchDirection::Backward) && self.in_flight()
  }

  fn in_flight(&self) -> bool {
    self
      .cache
      .meta(&self.key)
      .map(|meta| meta.in_flight)
      .unwrap_or(false)
  }

  /// Load the first page, or adopt an already-cached window.
  pub fn fetch(&mut self) {
    if let Some(pages) = self.cache.read::<Vec<P>>(&self.key) {
      self.seen = self.cache.version(&self.key);
      self.state = QueryState::Success(pages);
      return;
    }
    self.state = QueryState::Loading;
    self.spawn(self.first_page, FetchDirection::Forward);
  }

  /// Extend the window forward. No-op at the end of the feed or while a
  /// page fetch is running.
  pub fn fetch_next(&mut self) {
    if self.in_flight() {
      return;
    }
    let Some(page) = self.pages().last().and_then(Paged::next_page) else {
      return;
    };
    self.spawn(page, FetchDirection::Forward);
  }

  /// Re-load the page before the window.
  pub fn fetch_previous(&mut self) {
    if self.in_flight() {
      return;
    }
    let Some(page) = self.pages().first().and_then(Paged::prev_page) else {
      return;
    };
    self.spawn(page, FetchDirection::Backward);
  }

  /// Fold cache changes into the handle. Returns `true` on change.
  pub fn poll(&mut self) -> bool {
    let Some(meta) = self.cache.meta(&self.key) else {
      return false;
    };
    if !meta.in_flight {
      self.pending = None;
    }
    if meta.version == self.seen {
      return false;
    }
    self.seen = meta.version;
    if let Some(pages) = self.cache.read::<Vec<P>>(&self.key) {
      self.state = QueryState::Success(pages);
    } else if let Some(error) = meta.error {
      self.state = QueryState::Error(error);
    }
    true
  }

  fn spawn(&mut self, page: u32, direction: FetchDirection) {
    let Some(ticket) = self.cache.begin_fetch(&self.key) else {
      return;
    };
    self.pending = Some(direction);

    let cache = self.cache.clone();
    let key = self.key.clone();
    let max_pages = self.max_pages;
    let future = (self.fetcher)(page);
    tokio::spawn(async move {
      let result = future.await.map(|page| {
        let mut pages: Vec<P> = cache.read(&key).unwrap_or_default();
        extend_window(&mut pages, page, direction, max_pages);
        pages
      });
      cache.complete_fetch(ticket, result);
    });
  }
}

/// Append `page` at the given end of the window, trimming the far end when
/// the window exceeds `max_pages`.
fn extend_window<P>(pages: &mut Vec<P>, page: P, direction: FetchDirection, max_pages: usize) {
  match direction {
    FetchDirection::Forward => {
      pages.push(page);
      if pages.len() > max_pages {
        pages.remove(0);
      }
    }
    FetchDirection::Backward => {
      pages.insert(0, page);
      if pages.len() > max_pages {
        pages.pop();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;
  use std::time::Duration;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct FakePage {
    number: u32,
    prev: Option<u32>,
    next: Option<u32>,
  }

  impl Paged for FakePage {
    fn prev_page(&self) -> Option<u32> {
      self.prev
    }

    fn next_page(&self) -> Option<u32> {
      self.next
    }
  }

  const LAST_PAGE: u32 = 5;

  fn serve(page: u32) -> FakePage {
    FakePage {
      number: page,
      prev: (page > 1).then(|| page - 1),
      next: (page < LAST_PAGE).then(|| page + 1),
    }
  }

  fn feed(cache: &QueryCache, max_pages: usize) -> InfiniteQuery<FakePage> {
    InfiniteQuery::new(cache, QueryKey::feed("fake"), 1, max_pages, |page| async move {
      Ok(serve(page))
    })
  }

  async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }

  fn numbers(query: &InfiniteQuery<FakePage>) -> Vec<u32> {
    query.pages().iter().map(|p| p.number).collect()
  }

  #[tokio::test]
  async fn test_first_fetch_loads_initial_page() {
    let cache = QueryCache::new();
    let mut query = feed(&cache, 3);

    query.fetch();
    assert!(query.is_loading());
    settle().await;

    assert!(query.poll());
    assert_eq!(numbers(&query), vec![1]);
    assert!(query.has_next());
    assert!(!query.has_previous());
  }

  #[tokio::test]
  async fn test_fetch_next_accumulates_pages() {
    let cache = QueryCache::new();
    let mut query = feed(&cache, 3);

    query.fetch();
    settle().await;
    query.poll();

    for _ in 0..2 {
      query.fetch_next();
      settle().await;
      query.poll();
    }

    assert_eq!(numbers(&query), vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn test_window_trims_oldest_page() {
    let cache = QueryCache::new();
    let mut query = feed(&cache, 3);

    query.fetch();
    settle().await;
    query.poll();

    for _ in 0..3 {
      query.fetch_next();
      settle().await;
      query.poll();
    }

    // Four pages loaded, window keeps the newest three
    assert_eq!(numbers(&query), vec![2, 3, 4]);
    assert!(query.has_previous());
  }

  #[tokio::test]
  async fn test_fetch_previous_restores_trimmed_page() {
    let cache = QueryCache::new();
    let mut query = feed(&cache, 3);

    query.fetch();
    settle().await;
    query.poll();
    for _ in 0..3 {
      query.fetch_next();
      settle().await;
      query.poll();
    }
    assert_eq!(numbers(&query), vec![2, 3, 4]);

    query.fetch_previous();
    settle().await;
    query.poll();

    assert_eq!(numbers(&query), vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn test_fetch_next_stops_at_feed_end() {
    let cache = QueryCache::new();
    let mut query = feed(&cache, 10);

    query.fetch();
    settle().await;
    query.poll();

    for _ in 0..10 {
      query.fetch_next();
      settle().await;
      query.poll();
    }

    assert_eq!(numbers(&query), vec![1, 2, 3, 4, 5]);
    assert!(!query.has_next());
  }

  #[tokio::test]
  async fn test_adopts_cached_window() {
    let cache = QueryCache::new();
    let window: Vec<FakePage> = vec![serve(2), serve(3)];
    cache.write(&QueryKey::feed("fake"), &window);

    let mut query = feed(&cache, 3);
    query.fetch();

    assert_eq!(numbers(&query), vec![2, 3]);
  }
}
