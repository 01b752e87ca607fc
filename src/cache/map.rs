//! Synchronized Map Module
//!
//! Thread-safe string-keyed container, the storage primitive for the caches
//! built on top of it. A single read-write lock guards the map; readers copy
//! values out under the read lock and release before returning, writers take
//! exclusive access for the duration of their critical section.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::error;

// == Sync Map ==
/// Concurrent map from string keys to owned values.
///
/// Reads are deep copies: mutating a loaded value never affects cache state.
/// In-place mutation goes through [`SyncMap::update`], which scopes the
/// mutable borrow to the write lock so no live alias can escape.
#[derive(Debug, Default)]
pub struct SyncMap<V> {
    inner: RwLock<HashMap<String, V>>,
}

impl<V> SyncMap<V> {
    // == Constructor ==
    /// Creates a new empty map.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    // Poisoning only happens if a panic escaped a critical section; the data
    // is still coherent for this lock discipline, so recover the guard.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // == Store ==
    /// Inserts or overwrites a value. Empty keys are ignored.
    pub fn store(&self, key: &str, value: V) {
        if key.is_empty() {
            return;
        }
        self.write().insert(key.to_string(), value);
    }

    // == Update ==
    /// Mutates the stored value in place under the write lock, without a full
    /// re-store. Returns `true` if the key was present.
    pub fn update<F>(&self, key: &str, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        match self.write().get_mut(key) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    // == Delete ==
    /// Removes an entry, returning the owned value if it was present.
    pub fn delete(&self, key: &str) -> Option<V> {
        self.write().remove(key)
    }

    // == Remove Batch ==
    /// Removes a batch of keys in a single locked pass, returning the removed
    /// pairs. Amortizes the lock cost compared to per-key deletes.
    pub fn remove_batch(&self, keys: &[String]) -> Vec<(String, V)> {
        let mut guard = self.write();
        keys.iter()
            .filter_map(|key| guard.remove(key).map(|value| (key.clone(), value)))
            .collect()
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        self.write().clear();
    }

    // == Length ==
    /// Returns the number of entries physically present.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // == Contains ==
    /// Checks whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }
}

impl<V: Clone> SyncMap<V> {
    // == Load ==
    /// Returns a deep copy of the stored value, taken under the read lock.
    pub fn load(&self, key: &str) -> Option<V> {
        self.read().get(key).cloned()
    }

    // == Load Or Store ==
    /// Returns the existing value, or inserts `value` and returns a copy of it.
    ///
    /// The check and the insert happen under one write-lock acquisition, so
    /// the operation is atomic with respect to concurrent stores. The flag is
    /// `true` when an existing value was returned.
    pub fn load_or_store(&self, key: &str, value: V) -> (V, bool) {
        self.load_or_store_with(key, value, |_| true)
    }

    // == Load Or Store With ==
    /// Like [`SyncMap::load_or_store`], but an existing value only counts as
    /// present when `keep` accepts it; otherwise it is overwritten. Lets a
    /// caller treat logically dead values (e.g. expired entries) as absent.
    pub fn load_or_store_with<F>(&self, key: &str, value: V, keep: F) -> (V, bool)
    where
        F: FnOnce(&V) -> bool,
    {
        if key.is_empty() {
            return (value, false);
        }
        let mut guard = self.write();
        match guard.get(key) {
            Some(existing) if keep(existing) => (existing.clone(), true),
            _ => {
                guard.insert(key.to_string(), value.clone());
                (value, false)
            }
        }
    }

    // == Snapshot ==
    /// Returns a full deep copy of the map. Iteration over a snapshot never
    /// holds the lock during user callbacks.
    pub fn snapshot(&self) -> HashMap<String, V> {
        self.read().clone()
    }

    // == For Each ==
    /// Calls `f` for every entry of a snapshot. A panic inside `f` is caught
    /// and logged per entry; it never propagates to the caller.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &V),
    {
        for (key, value) in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| f(&key, &value))).is_err() {
                error!(key = %key, "for_each callback panicked, skipping entry");
            }
        }
    }
}
