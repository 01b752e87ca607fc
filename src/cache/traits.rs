//! Cache Contract Module
//!
//! The capability contract cache collaborators program against. Consumers hold
//! an `Arc<dyn Cache<T>>` so a caching-disabled configuration can swap in the
//! no-op implementation without touching call sites.

use std::time::Duration;

use crate::error::Result;

// == Cache Trait ==
/// Operations any cache-like collaborator must provide.
///
/// Misses are signaled with `Option`/`bool`, not errors; only a mutating call
/// on a closed cache produces an error.
pub trait Cache<T: Clone>: Send + Sync {
    /// Shuts the cache down. After close, stores fail and reads miss.
    fn close(&self);

    /// Removes every entry.
    fn clear(&self);

    /// Number of entries physically present, including expired-but-unswept.
    fn len(&self) -> usize;

    /// Resets a live key's deadline to the default TTL. Returns `true` if the
    /// key was present.
    fn extend(&self, key: &str) -> bool;

    /// Stores a value under the default TTL.
    fn store(&self, key: &str, value: T) -> Result<()>;

    /// Stores a value expiring `ttl` from now.
    fn store_with_expire(&self, key: &str, value: T, ttl: Duration) -> Result<()>;

    /// Returns a copy of the value if present and unexpired.
    fn load(&self, key: &str) -> Option<T>;

    /// Returns the existing unexpired value, or inserts `value` under the
    /// default TTL. The flag is `true` when an existing value was returned.
    fn load_or_store(&self, key: &str, value: T) -> (T, bool);

    /// Removes an entry if present.
    fn delete(&self, key: &str);

    /// Visits every unexpired entry.
    fn for_each(&self, f: &mut dyn FnMut(&str, &T));
}
