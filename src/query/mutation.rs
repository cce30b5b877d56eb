//! Mutations against the cache, including the speculative delete flow.
//!
//! `delete_with_rollback` is the orchestration used by list screens: it
//! removes the item from the cached collection before the server confirms,
//! restores the snapshot if the server refuses, and always ends by
//! invalidating the collection and evicting the item's own entry so the
//! next read re-validates against the server.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::debug;

use crate::api::ApiError;
use crate::models::Entity;

use super::cache::QueryCache;
use super::key::QueryKey;

/// Delete `id` from the cached collection of `T` with a speculative local
/// update, then run the remote delete.
///
/// In order:
/// 1. cancel any outstanding fetch for the collection, so a slow response
///    cannot overwrite the speculative edit,
/// 2. snapshot the collection entry and write it back with `id` filtered
///    out (one atomic step; skipped when the entry is absent),
/// 3. run the remote call,
/// 4. on failure, restore the snapshot,
/// 5. mark the collection stale and evict the item entry.
///
/// Step 5 runs on success and failure alike: the speculative state is only
/// trusted until the next re-fetch, and a deleted item must never be served
/// from its single-item entry. The error, if any, is returned as a value;
/// nothing is thrown past this function.
///
/// When two deletes overlap, the second snapshots the state left by the
/// first's speculative edit, so each rollback only undoes its own removal.
/// A rollback can still clobber a newer speculative edit; the staleness
/// mark is the backstop that re-aligns the entry with the server.
pub async fn delete_with_rollback<T, F, Fut>(
  cache: QueryCache,
  id: T::Id,
  remote: F,
) -> Result<(), ApiError>
where
  T: Entity,
  F: FnOnce(T::Id) -> Fut,
  Fut: Future<Output = Result<(), ApiError>>,
{
  let collection = QueryKey::collection(T::resource());
  let item = QueryKey::item(T::resource(), &id);

  cache.cancel_in_flight(&collection);

  let backup = cache.modify(&collection, |items: &Vec<T>| without_item(items, &id));

  let result = remote(id).await;

  if result.is_err() {
    if let Some(previous) = &backup {
      debug!(key = %collection, "remote delete failed, restoring snapshot");
      cache.write(&collection, previous);
    }
  }

  cache.mark_stale(&collection);
  cache.evict(&item);

  result
}

/// Copy of `items` with the item matching `id` removed. Matching is by
/// identifier only; the relative order of everything else is preserved.
fn without_item<T: Entity>(items: &[T], id: &T::Id) -> Vec<T> {
  items
    .iter()
    .filter(|item| &item.id() != id)
    .cloned()
    .collect()
}

/// Outcome of the most recent mutation, for rendering
#[derive(Debug, Clone, Default)]
pub enum MutationState {
  #[default]
  Idle,
  Pending,
  Success,
  Failed(String),
}

/// Handle for running a mutation from a view and polling its outcome.
///
/// The mutation future itself owns all cache effects (speculation, rollback,
/// invalidation); this handle only carries its outcome back to the UI as a
/// value. Starting a new mutation while one is pending is allowed - the
/// handle then reports the newest one.
#[derive(Default)]
pub struct Mutation {
  state: MutationState,
  receiver: Option<mpsc::UnboundedReceiver<Result<(), String>>>,
}

impl Mutation {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &MutationState {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn error(&self) -> Option<&str> {
    match &self.state {
      MutationState::Failed(e) => Some(e),
      _ => None,
    }
  }

  /// Spawn the mutation future.
  pub fn run<F>(&mut self, future: F)
  where
    F: Future<Output = Result<(), ApiError>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      let result = future.await.map_err(|e| e.to_string());
      // Ignore send errors - a newer mutation may have replaced the receiver
      let _ = tx.send(result);
    });
  }

  /// Poll for the outcome. Returns `true` when the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(())) => {
        self.state = MutationState::Success;
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = MutationState::Failed(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Failed("mutation was dropped".to_string());
        self.receiver = None;
        true
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::{Deserialize, Serialize};
  use std::time::Duration;
  use tokio::sync::oneshot;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Track {
    id: u64,
    title: String,
  }

  impl Entity for Track {
    type Id = u64;

    fn id(&self) -> u64 {
      self.id
    }

    fn resource() -> &'static str {
      "tracks"
    }
  }

  fn track(id: u64) -> Track {
    Track {
      id,
      title: format!("track {}", id),
    }
  }

  fn collection() -> QueryKey {
    QueryKey::collection("tracks")
  }

  fn seeded_cache(ids: &[u64]) -> QueryCache {
    let cache = QueryCache::new();
    let items: Vec<Track> = ids.iter().copied().map(track).collect();
    cache.write(&collection(), &items);
    cache
  }

  fn cached_ids(cache: &QueryCache) -> Option<Vec<u64>> {
    cache
      .read::<Vec<Track>>(&collection())
      .map(|items| items.iter().map(|t| t.id).collect())
  }

  #[test]
  fn test_without_item_removes_exactly_one() {
    let items: Vec<Track> = [1, 2, 3].iter().map(|&id| track(id)).collect();
    let remaining = without_item(&items, &2);
    let ids: Vec<u64> = remaining.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 3]);
  }

  #[test]
  fn test_without_item_absent_id_is_identity() {
    let items: Vec<Track> = [1, 2, 3].iter().map(|&id| track(id)).collect();
    let remaining = without_item(&items, &9);
    assert_eq!(remaining, items);
  }

  #[tokio::test]
  async fn test_successful_delete_keeps_speculative_state() {
    let cache = seeded_cache(&[1, 2, 3]);
    cache.write(&QueryKey::item("tracks", 2), &track(2));

    let result =
      delete_with_rollback::<Track, _, _>(cache.clone(), 2, |_| async { Ok(()) }).await;

    assert!(result.is_ok());
    assert_eq!(cached_ids(&cache), Some(vec![1, 3]));

    // The collection re-validates on the next read, and the deleted item
    // can no longer be served from its own entry
    let meta = cache.meta(&collection()).unwrap();
    assert!(meta.stale);
    assert!(!cache.contains(&QueryKey::item("tracks", 2)));
  }

  #[tokio::test]
  async fn test_failed_delete_restores_snapshot() {
    let cache = seeded_cache(&[1, 2, 3]);

    let (confirm_tx, confirm_rx) = oneshot::channel::<()>();
    let worker = {
      let cache = cache.clone();
      tokio::spawn(async move {
        delete_with_rollback::<Track, _, _>(cache, 2, move |_| async move {
          confirm_rx.await.ok();
          Err(ApiError::Timeout)
        })
        .await
      })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    // While the remote call is in flight, reads observe the speculative state
    assert_eq!(cached_ids(&cache), Some(vec![1, 3]));

    confirm_tx.send(()).unwrap();
    let result = worker.await.unwrap();

    assert!(result.is_err());
    assert_eq!(cached_ids(&cache), Some(vec![1, 2, 3]));
    assert!(cache.meta(&collection()).unwrap().stale);
  }

  #[tokio::test]
  async fn test_delete_without_cached_collection_still_calls_remote() {
    let cache = QueryCache::new();

    let result =
      delete_with_rollback::<Track, _, _>(cache.clone(), 2, |_| async { Ok(()) }).await;

    assert!(result.is_ok());
    assert_eq!(cached_ids(&cache), None);
  }

  #[tokio::test]
  async fn test_failed_delete_without_snapshot_writes_nothing() {
    let cache = QueryCache::new();

    let result = delete_with_rollback::<Track, _, _>(cache.clone(), 2, |_| async {
      Err(ApiError::Timeout)
    })
    .await;

    assert!(result.is_err());
    assert!(!cache.contains(&collection()));
  }

  #[tokio::test]
  async fn test_delete_cancels_outstanding_collection_fetch() {
    let cache = seeded_cache(&[1, 2, 3]);

    // A slow list fetch is in flight when the delete starts
    let stale_ticket = cache.begin_fetch(&collection()).unwrap();

    let result =
      delete_with_rollback::<Track, _, _>(cache.clone(), 2, |_| async { Ok(()) }).await;
    assert!(result.is_ok());

    // The fetch lands late with the full list; it must not resurrect the
    // deleted item
    let full: Vec<Track> = [1, 2, 3].iter().map(|&id| track(id)).collect();
    cache.complete_fetch(stale_ticket, Ok::<_, ApiError>(full));
    assert_eq!(cached_ids(&cache), Some(vec![1, 3]));
  }

  #[tokio::test]
  async fn test_overlapping_deletes_compose() {
    let cache = seeded_cache(&[1, 2, 3]);

    let (first_tx, first_rx) = oneshot::channel::<Result<(), ApiError>>();
    let first = {
      let cache = cache.clone();
      tokio::spawn(async move {
        delete_with_rollback::<Track, _, _>(cache, 1, move |_| async move {
          first_rx.await.unwrap()
        })
        .await
      })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(cached_ids(&cache), Some(vec![2, 3]));

    let (second_tx, second_rx) = oneshot::channel::<Result<(), ApiError>>();
    let second = {
      let cache = cache.clone();
      tokio::spawn(async move {
        delete_with_rollback::<Track, _, _>(cache, 3, move |_| async move {
          second_rx.await.unwrap()
        })
        .await
      })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    // The second delete snapshots the state after the first's speculative
    // edit, not the original collection
    assert_eq!(cached_ids(&cache), Some(vec![2]));

    // Both succeed: the composed speculative state stands
    first_tx.send(Ok(())).unwrap();
    second_tx.send(Ok(())).unwrap();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(cached_ids(&cache), Some(vec![2]));
    assert!(cache.meta(&collection()).unwrap().stale);
  }

  #[tokio::test]
  async fn test_overlapping_deletes_first_fails() {
    let cache = seeded_cache(&[1, 2, 3]);

    let (first_tx, first_rx) = oneshot::channel::<Result<(), ApiError>>();
    let first = {
      let cache = cache.clone();
      tokio::spawn(async move {
        delete_with_rollback::<Track, _, _>(cache, 1, move |_| async move {
          first_rx.await.unwrap()
        })
        .await
      })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    let (second_tx, second_rx) = oneshot::channel::<Result<(), ApiError>>();
    let second = {
      let cache = cache.clone();
      tokio::spawn(async move {
        delete_with_rollback::<Track, _, _>(cache, 3, move |_| async move {
          second_rx.await.unwrap()
        })
        .await
      })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(cached_ids(&cache), Some(vec![2]));

    // First fails after the second already speculated. Its rollback restores
    // its own pre-edit snapshot [1, 2, 3], overwriting the second's edit -
    // the accepted stale-snapshot case. The entry must never be stuck
    // claiming both removals happened, and it must be stale so the next
    // fetch re-aligns with the server.
    first_tx.send(Err(ApiError::Timeout)).unwrap();
    first.await.unwrap().unwrap_err();
    assert_eq!(cached_ids(&cache), Some(vec![1, 2, 3]));

    second_tx.send(Ok(())).unwrap();
    second.await.unwrap().unwrap();

    let ids = cached_ids(&cache).unwrap();
    assert!(ids.contains(&1), "unconfirmed removal of 1 must not stick");
    assert!(cache.meta(&collection()).unwrap().stale);
  }

  #[tokio::test]
  async fn test_mutation_handle_reports_failure_as_state() {
    let mut mutation = Mutation::new();
    mutation.run(async { Err(ApiError::Timeout) });
    assert!(mutation.is_pending());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutation.poll());
    assert_eq!(mutation.error(), Some("request timed out"));
  }

  #[tokio::test]
  async fn test_mutation_handle_success() {
    let mut mutation = Mutation::new();
    mutation.run(async { Ok(()) });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutation.poll());
    assert!(matches!(mutation.state(), MutationState::Success));
  }
}
