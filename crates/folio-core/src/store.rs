//! The key-value store abstraction.
//!
//! All durable state in the backend goes through this one interface; there
//! are no parallel ad hoc stores. The store is opaque: string keys, JSON
//! values. On top of plain `get`/`set` the trait requires
//! [`compare_and_swap`](KeyValueStore::compare_and_swap) so that
//! read-modify-write sequences (rate-limit windows, submission updates) can
//! be retried optimistically instead of losing updates under contention.
//!
//! Key layout used by the backend:
//!
//! - `room:<userId>`: a writer's denormalized room/profile record
//! - `draft:<id>`, `exhibit:<id>`: owned resources
//! - `submission:<id>`: editorial submissions, plus `submissions:index`
//! - `<rateLimitPrefix>:<identifier>`: sliding-window timestamp arrays
//!
//! Entry expiry is the store's concern: a production backend should mount an
//! implementation with TTL eviction for rate-limit keys. The in-process
//! [`MemoryStore`] does not evict.

use crate::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A stored value could not be decoded.
    #[error("corrupt value at key '{key}': {reason}")]
    Corrupt {
        /// The key holding the bad value.
        key: String,
        /// Why decoding failed.
        reason: String,
    },
}

/// An opaque asynchronous key-value store.
///
/// Implementations must make `compare_and_swap` atomic with respect to
/// concurrent calls on the same key.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Reads the value at `key`, if any.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>>;

    /// Writes `value` at `key`, unconditionally.
    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Writes `new` at `key` only if the current value equals `expected`
    /// (`None` meaning the key must be absent). Returns whether the swap
    /// happened.
    fn compare_and_swap<'a>(
        &'a self,
        key: &'a str,
        expected: Option<&'a Value>,
        new: Value,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;
}

/// Builds the store key for a typed resource.
#[must_use]
pub fn resource_key(kind: &str, id: &str) -> String {
    format!("{kind}:{id}")
}

/// In-process store backed by a mutex-guarded map.
///
/// Used by tests and local development. CAS is atomic under the lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a value, for test setup.
    pub async fn seed(&self, key: impl Into<String>, value: Value) {
        self.entries.lock().await.insert(key.into(), value);
    }

    /// Returns the number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>> {
        Box::pin(async move { Ok(self.entries.lock().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.entries.lock().await.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn compare_and_swap<'a>(
        &'a self,
        key: &'a str,
        expected: Option<&'a Value>,
        new: Value,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            if entries.get(key) == expected {
                entries.insert(key.to_string(), new);
                Ok(true)
            } else {
                Ok(false)
            }
        })
    }
}

/// A store wrapper that fails every call, for exercising degraded paths.
#[derive(Debug, Default)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>> {
        Box::pin(async { Err(StoreError::Unavailable("store offline".into())) })
    }

    fn set<'a>(&'a self, _key: &'a str, _value: Value) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async { Err(StoreError::Unavailable("store offline".into())) })
    }

    fn compare_and_swap<'a>(
        &'a self,
        _key: &'a str,
        _expected: Option<&'a Value>,
        _new: Value,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async { Err(StoreError::Unavailable("store offline".into())) })
    }
}
