//! Key-addressed store of asynchronous results.
//!
//! Every entry carries a version stamp taken from a cache-wide clock;
//! consumers subscribe by remembering the last version they rendered and
//! comparing on each tick. All writes happen under one lock acquisition, so
//! an observer sees either the previous value or the new one, never a torn
//! intermediate.
//!
//! Fetch admission is part of the store: `begin_fetch` marks a key in flight
//! and hands out a ticket, and a result is only applied by `complete_fetch`
//! when the ticket's epoch still matches the entry. `cancel_in_flight` bumps
//! the epoch, so results of cancelled fetches are discarded rather than
//! overwriting later writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::key::QueryKey;

#[derive(Default)]
struct Entry {
  value: Option<Value>,
  error: Option<String>,
  version: u64,
  fetched_at: Option<DateTime<Utc>>,
  stale: bool,
  epoch: u64,
  in_flight: bool,
  fetches: u64,
}

struct Inner {
  entries: HashMap<QueryKey, Entry>,
  /// Cache-wide write clock; strictly increasing across evictions
  clock: u64,
}

/// Snapshot of an entry's bookkeeping, without its value
#[derive(Debug, Clone)]
pub struct EntryMeta {
  pub version: u64,
  pub has_value: bool,
  pub error: Option<String>,
  pub fetched_at: Option<DateTime<Utc>>,
  pub stale: bool,
  pub in_flight: bool,
  pub fetches: u64,
}

/// Permission to run one fetch for a key, handed out by [`QueryCache::begin_fetch`]
pub struct FetchTicket {
  key: QueryKey,
  epoch: u64,
}

/// Shared in-memory query cache.
/// Cheap to clone; all clones address the same store.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Mutex<Inner>>,
}

impl QueryCache {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        entries: HashMap::new(),
        clock: 0,
      })),
    }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    // Lock poisoning would mean a panic while holding the guard; there is no
    // reasonable recovery, so propagate the panic.
    self.inner.lock().expect("query cache lock poisoned")
  }

  /// Read the value under `key`, if present and decodable as `T`.
  pub fn read<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
    let inner = self.lock();
    let value = inner.entries.get(key)?.value.as_ref()?;
    match serde_json::from_value(value.clone()) {
      Ok(decoded) => Some(decoded),
      Err(e) => {
        warn!(%key, error = %e, "cached value does not decode");
        None
      }
    }
  }

  /// Whether `key` currently holds a value. Used by list screens to mark
  /// items whose detail entry is already warmed.
  pub fn contains(&self, key: &QueryKey) -> bool {
    let inner = self.lock();
    inner
      .entries
      .get(key)
      .map(|entry| entry.value.is_some())
      .unwrap_or(false)
  }

  /// Replace the value under `key`, notifying subscribers.
  pub fn write<T: Serialize>(&self, key: &QueryKey, value: &T) {
    let encoded = match serde_json::to_value(value) {
      Ok(encoded) => encoded,
      Err(e) => {
        warn!(%key, error = %e, "value does not encode, write dropped");
        return;
      }
    };

    let mut inner = self.lock();
    inner.clock += 1;
    let version = inner.clock;
    let entry = inner.entries.entry(key.clone()).or_default();
    entry.value = Some(encoded);
    entry.error = None;
    entry.stale = false;
    entry.fetched_at = Some(Utc::now());
    entry.version = version;
  }

  /// Replace the value under `key` with `f(current)`, returning the previous
  /// value. Snapshot and replacement happen under one lock acquisition.
  /// Returns `None` (and writes nothing) when the key holds no value.
  ///
  /// `f` must not call back into the cache.
  pub fn modify<T>(&self, key: &QueryKey, f: impl FnOnce(&T) -> T) -> Option<T>
  where
    T: Serialize + DeserializeOwned,
  {
    let mut inner = self.lock();
    inner.clock += 1;
    let version = inner.clock;
    let entry = inner.entries.get_mut(key)?;
    let previous: T = match entry.value.as_ref() {
      Some(value) => match serde_json::from_value(value.clone()) {
        Ok(decoded) => decoded,
        Err(e) => {
          warn!(%key, error = %e, "cached value does not decode, modify skipped");
          return None;
        }
      },
      None => return None,
    };

    let next = f(&previous);
    match serde_json::to_value(&next) {
      Ok(encoded) => {
        entry.value = Some(encoded);
        entry.version = version;
      }
      Err(e) => warn!(%key, error = %e, "modified value does not encode, write dropped"),
    }
    Some(previous)
  }

  /// Mark the entry stale so the next consumer tick re-validates it.
  pub fn mark_stale(&self, key: &QueryKey) {
    let mut inner = self.lock();
    inner.clock += 1;
    let version = inner.clock;
    if let Some(entry) = inner.entries.get_mut(key) {
      entry.stale = true;
      entry.version = version;
      debug!(%key, "marked stale");
    }
  }

  /// Drop the entry entirely.
  pub fn evict(&self, key: &QueryKey) {
    let mut inner = self.lock();
    if inner.entries.remove(key).is_some() {
      debug!(%key, "evicted");
    }
  }

  /// Best-effort cancellation of an outstanding fetch for `key`: the fetch
  /// itself keeps running, but its result will fail the epoch check in
  /// `complete_fetch` and be discarded.
  pub fn cancel_in_flight(&self, key: &QueryKey) {
    let mut inner = self.lock();
    if let Some(entry) = inner.entries.get_mut(key) {
      if entry.in_flight {
        entry.epoch += 1;
        entry.in_flight = false;
        debug!(%key, "cancelled in-flight fetch");
      }
    }
  }

  /// Try to admit a fetch for `key`. Returns `None` when one is already in
  /// flight - this is where concurrent queries for the same key coalesce.
  pub fn begin_fetch(&self, key: &QueryKey) -> Option<FetchTicket> {
    let mut inner = self.lock();
    let entry = inner.entries.entry(key.clone()).or_default();
    if entry.in_flight {
      return None;
    }
    entry.in_flight = true;
    entry.fetches += 1;
    Some(FetchTicket {
      key: key.clone(),
      epoch: entry.epoch,
    })
  }

  /// Apply a fetch result. The result is discarded when the entry's epoch
  /// moved past the ticket's (the fetch was cancelled) or the entry is gone.
  /// A failed fetch keeps any existing value and records the error.
  pub fn complete_fetch<T: Serialize>(
    &self,
    ticket: FetchTicket,
    result: Result<T, crate::api::ApiError>,
  ) {
    let mut inner = self.lock();
    inner.clock += 1;
    let version = inner.clock;
    let Some(entry) = inner.entries.get_mut(&ticket.key) else {
      return;
    };
    if entry.epoch != ticket.epoch {
      debug!(key = %ticket.key, "discarding result of cancelled fetch");
      return;
    }
    entry.in_flight = false;
    match result {
      Ok(value) => match serde_json::to_value(&value) {
        Ok(encoded) => {
          entry.value = Some(encoded);
          entry.error = None;
          entry.stale = false;
          entry.fetched_at = Some(Utc::now());
        }
        Err(e) => {
          warn!(key = %ticket.key, error = %e, "fetched value does not encode");
          entry.error = Some(e.to_string());
        }
      },
      Err(e) => {
        debug!(key = %ticket.key, error = %e, "fetch failed");
        entry.error = Some(e.to_string());
      }
    }
    entry.version = version;
  }

  /// Entry bookkeeping for `key`, if the entry exists.
  pub fn meta(&self, key: &QueryKey) -> Option<EntryMeta> {
    let inner = self.lock();
    inner.entries.get(key).map(|entry| EntryMeta {
      version: entry.version,
      has_value: entry.value.is_some(),
      error: entry.error.clone(),
      fetched_at: entry.fetched_at,
      stale: entry.stale,
      in_flight: entry.in_flight,
      fetches: entry.fetches,
    })
  }

  /// Current version stamp of `key` (0 when absent). Subscribers compare
  /// this against the last version they observed.
  pub fn version(&self, key: &QueryKey) -> u64 {
    let inner = self.lock();
    inner
      .entries
      .get(key)
      .map(|entry| entry.version)
      .unwrap_or(0)
  }
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ApiError;

  fn movies_key() -> QueryKey {
    QueryKey::collection("movies")
  }

  #[test]
  fn test_write_read_round_trip() {
    let cache = QueryCache::new();
    cache.write(&movies_key(), &vec![1u64, 2, 3]);
    assert_eq!(cache.read::<Vec<u64>>(&movies_key()), Some(vec![1, 2, 3]));
  }

  #[test]
  fn test_read_absent_key() {
    let cache = QueryCache::new();
    assert_eq!(cache.read::<Vec<u64>>(&movies_key()), None);
    assert!(!cache.contains(&movies_key()));
  }

  #[test]
  fn test_writes_bump_version() {
    let cache = QueryCache::new();
    cache.write(&movies_key(), &1u64);
    let first = cache.version(&movies_key());
    cache.write(&movies_key(), &2u64);
    assert!(cache.version(&movies_key()) > first);
  }

  #[test]
  fn test_modify_returns_previous_and_applies() {
    let cache = QueryCache::new();
    cache.write(&movies_key(), &vec![1u64, 2, 3]);

    let previous = cache.modify(&movies_key(), |items: &Vec<u64>| {
      items.iter().copied().filter(|&n| n != 2).collect()
    });

    assert_eq!(previous, Some(vec![1, 2, 3]));
    assert_eq!(cache.read::<Vec<u64>>(&movies_key()), Some(vec![1, 3]));
  }

  #[test]
  fn test_modify_absent_is_noop() {
    let cache = QueryCache::new();
    let previous = cache.modify(&movies_key(), |items: &Vec<u64>| items.clone());
    assert_eq!(previous, None);
    assert!(!cache.contains(&movies_key()));
  }

  #[test]
  fn test_mark_stale_bumps_version() {
    let cache = QueryCache::new();
    cache.write(&movies_key(), &vec![1u64]);
    let before = cache.version(&movies_key());

    cache.mark_stale(&movies_key());

    let meta = cache.meta(&movies_key()).unwrap();
    assert!(meta.stale);
    assert!(meta.version > before);
  }

  #[test]
  fn test_evict_removes_entry() {
    let cache = QueryCache::new();
    cache.write(&movies_key(), &vec![1u64]);
    cache.evict(&movies_key());
    assert!(cache.meta(&movies_key()).is_none());
  }

  #[test]
  fn test_version_survives_eviction() {
    // The clock is cache-wide, so a re-created entry never reuses an old
    // version stamp and subscribers cannot miss the change.
    let cache = QueryCache::new();
    cache.write(&movies_key(), &1u64);
    let before = cache.version(&movies_key());
    cache.evict(&movies_key());
    cache.write(&movies_key(), &2u64);
    assert!(cache.version(&movies_key()) > before);
  }

  #[test]
  fn test_begin_fetch_coalesces() {
    let cache = QueryCache::new();
    let first = cache.begin_fetch(&movies_key());
    assert!(first.is_some());
    assert!(cache.begin_fetch(&movies_key()).is_none());

    cache.complete_fetch(first.unwrap(), Ok::<_, ApiError>(vec![1u64]));
    assert!(cache.begin_fetch(&movies_key()).is_some());
  }

  #[test]
  fn test_fetch_count_increments_per_admitted_fetch() {
    let cache = QueryCache::new();
    let ticket = cache.begin_fetch(&movies_key()).unwrap();
    cache.begin_fetch(&movies_key()); // coalesced, not counted
    cache.complete_fetch(ticket, Ok::<_, ApiError>(1u64));
    assert_eq!(cache.meta(&movies_key()).unwrap().fetches, 1);
  }

  #[test]
  fn test_cancelled_fetch_result_is_discarded() {
    let cache = QueryCache::new();
    cache.write(&movies_key(), &vec![1u64, 3]);

    let stale_ticket = cache.begin_fetch(&movies_key()).unwrap();
    cache.cancel_in_flight(&movies_key());

    // A newer fetch is admitted after cancellation
    let fresh_ticket = cache.begin_fetch(&movies_key()).unwrap();

    // The cancelled fetch lands late; it must not clobber the entry or the
    // newer fetch's in-flight marker
    cache.complete_fetch(stale_ticket, Ok::<_, ApiError>(vec![1u64, 2, 3]));
    assert_eq!(cache.read::<Vec<u64>>(&movies_key()), Some(vec![1, 3]));
    assert!(cache.meta(&movies_key()).unwrap().in_flight);

    cache.complete_fetch(fresh_ticket, Ok::<_, ApiError>(vec![1u64]));
    assert_eq!(cache.read::<Vec<u64>>(&movies_key()), Some(vec![1]));
    assert!(!cache.meta(&movies_key()).unwrap().in_flight);
  }

  #[test]
  fn test_failed_fetch_keeps_value_and_records_error() {
    let cache = QueryCache::new();
    cache.write(&movies_key(), &vec![1u64]);

    let ticket = cache.begin_fetch(&movies_key()).unwrap();
    cache.complete_fetch::<Vec<u64>>(ticket, Err(ApiError::Timeout));

    let meta = cache.meta(&movies_key()).unwrap();
    assert!(meta.has_value);
    assert_eq!(meta.error.as_deref(), Some("request timed out"));
    assert_eq!(cache.read::<Vec<u64>>(&movies_key()), Some(vec![1]));
  }
}
