//! TTL Cache Module
//!
//! Unbounded per-key-TTL cache with lazy expiry on read and a background
//! janitor that physically evicts expired entries. Expired-but-unswept entries
//! miss on `load` without being deleted there; deletion is deferred to the
//! janitor so the hot read path never takes the write lock.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::cache::{Cache, CacheEntry, SyncMap};
use crate::error::{CacheError, Result};
use crate::tasks::spawn_supervised;

// == Constants ==
/// Smallest accepted cleanup interval; anything shorter is floored to this.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Cleanup interval used when none is configured.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Backoff before the janitor is respawned after a panic.
const JANITOR_RESTART_BACKOFF: Duration = Duration::from_secs(5);

/// Callback receiving the key→value batch removed by one sweep.
pub type ExpiryCallback<T> = Arc<dyn Fn(HashMap<String, T>) + Send + Sync>;

// == TTL Cache ==
/// Per-key TTL cache. Cloning yields another handle to the same cache.
///
/// Construction spawns the janitor and therefore must happen inside a tokio
/// runtime. The janitor holds only a weak reference, so dropping every handle
/// winds the task down within one tick even without an explicit [`TtlCache::close`].
pub struct TtlCache<T> {
    inner: Arc<TtlInner<T>>,
}

impl<T> Clone for TtlCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct TtlInner<T> {
    map: SyncMap<CacheEntry<T>>,
    default_ttl: Duration,
    /// Cleanup interval in milliseconds; atomic so it can be retuned live.
    cleanup_interval_ms: AtomicU64,
    closed: AtomicBool,
    shutdown: Notify,
    on_expire: Option<ExpiryCallback<T>>,
}

impl<T> TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache and spawns its janitor.
    ///
    /// `cleanup_interval` is floored to [`MIN_CLEANUP_INTERVAL`].
    pub fn new(default_ttl: Duration, cleanup_interval: Duration) -> Self {
        Self::build(default_ttl, cleanup_interval, None)
    }

    /// Like [`TtlCache::new`], with a callback receiving each sweep's expired
    /// key→value batch. The callback runs on a detached task, panic-isolated
    /// from the janitor loop.
    pub fn with_expiry_callback<F>(
        default_ttl: Duration,
        cleanup_interval: Duration,
        on_expire: F,
    ) -> Self
    where
        F: Fn(HashMap<String, T>) + Send + Sync + 'static,
    {
        Self::build(default_ttl, cleanup_interval, Some(Arc::new(on_expire)))
    }

    fn build(
        default_ttl: Duration,
        cleanup_interval: Duration,
        on_expire: Option<ExpiryCallback<T>>,
    ) -> Self {
        let interval = cleanup_interval.max(MIN_CLEANUP_INTERVAL);
        let inner = Arc::new(TtlInner {
            map: SyncMap::new(),
            default_ttl,
            cleanup_interval_ms: AtomicU64::new(interval.as_millis() as u64),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
            on_expire,
        });

        spawn_janitor(Arc::downgrade(&inner));

        Self { inner }
    }

    // == Store ==
    /// Stores a value under the default TTL, resetting any existing deadline.
    ///
    /// Fails with [`CacheError::Closed`] once the cache has been closed.
    pub fn store(&self, key: &str, value: T) -> Result<()> {
        self.store_with_expire(key, value, self.inner.default_ttl)
    }

    /// Stores a value expiring `ttl` from now. A zero TTL yields an entry
    /// that misses on the next read.
    pub fn store_with_expire(&self, key: &str, value: T, ttl: Duration) -> Result<()> {
        if self.is_closed() {
            return Err(CacheError::Closed);
        }
        self.inner.map.store(key, CacheEntry::new(value, ttl));
        Ok(())
    }

    // == Load ==
    /// Returns a copy of the value if present and unexpired.
    ///
    /// An expired-but-unswept entry misses without being removed here; the
    /// janitor owns physical deletion.
    pub fn load(&self, key: &str) -> Option<T> {
        if self.is_closed() {
            return None;
        }
        self.inner
            .map
            .load(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value)
    }

    // == Load Or Store ==
    /// Returns the existing unexpired value, or inserts `value` under the
    /// default TTL. The check and the insert share one write-lock
    /// acquisition, so the operation is atomic against concurrent stores.
    /// The flag is `true` when an existing value was returned.
    pub fn load_or_store(&self, key: &str, value: T) -> (T, bool) {
        if self.is_closed() {
            return (value, false);
        }
        let ttl = self.inner.default_ttl;
        let (entry, found) =
            self.inner
                .map
                .load_or_store_with(key, CacheEntry::new(value, ttl), |existing| {
                    !existing.is_expired()
                });
        (entry.value, found)
    }

    // == Extend ==
    /// Resets a key's deadline to the default TTL in place, leaving the value
    /// untouched. Returns `true` if the key was present; no-op when absent or
    /// after close.
    pub fn extend(&self, key: &str) -> bool {
        if self.is_closed() {
            return false;
        }
        let ttl = self.inner.default_ttl;
        self.inner.map.update(key, |entry| entry.refresh(ttl))
    }

    // == Delete ==
    /// Removes an entry if present.
    pub fn delete(&self, key: &str) {
        self.inner.map.delete(key);
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.map.clear();
    }

    // == Length ==
    /// Number of entries physically present.
    ///
    /// Counts raw slots, including expired-but-unswept entries that `load`
    /// already treats as misses. The count converges after the next sweep.
    pub fn len(&self) -> usize {
        self.inner.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.map.is_empty()
    }

    // == For Each ==
    /// Visits every unexpired entry of a snapshot; the lock is never held
    /// during `f`, and a panic inside `f` is caught and logged.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &T),
    {
        if self.is_closed() {
            return;
        }
        self.inner.map.for_each(|key, entry| {
            if !entry.is_expired() {
                f(key, &entry.value);
            }
        });
    }

    // == Set Cleanup Interval ==
    /// Retunes the janitor interval, floored to [`MIN_CLEANUP_INTERVAL`].
    /// Takes effect on the next tick.
    pub fn set_cleanup_interval(&self, interval: Duration) {
        let interval = interval.max(MIN_CLEANUP_INTERVAL);
        self.inner
            .cleanup_interval_ms
            .store(interval.as_millis() as u64, Ordering::Release);
    }

    // == Close ==
    /// Shuts the cache down: stops the janitor within one tick and clears the
    /// map. Idempotent; only the first caller tears down. After close every
    /// store fails and every read misses.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.shutdown.notify_waiters();
        self.inner.map.clear();
        info!("ttl cache closed");
    }

    /// Whether [`TtlCache::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl<T> Cache<T> for TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn close(&self) {
        TtlCache::close(self);
    }

    fn clear(&self) {
        TtlCache::clear(self);
    }

    fn len(&self) -> usize {
        TtlCache::len(self)
    }

    fn extend(&self, key: &str) -> bool {
        TtlCache::extend(self, key)
    }

    fn store(&self, key: &str, value: T) -> Result<()> {
        TtlCache::store(self, key, value)
    }

    fn store_with_expire(&self, key: &str, value: T, ttl: Duration) -> Result<()> {
        TtlCache::store_with_expire(self, key, value, ttl)
    }

    fn load(&self, key: &str) -> Option<T> {
        TtlCache::load(self, key)
    }

    fn load_or_store(&self, key: &str, value: T) -> (T, bool) {
        TtlCache::load_or_store(self, key, value)
    }

    fn delete(&self, key: &str) {
        TtlCache::delete(self, key);
    }

    fn for_each(&self, f: &mut dyn FnMut(&str, &T)) {
        TtlCache::for_each(self, |key, value| f(key, value));
    }
}

// == Janitor ==
/// Spawns the sweep loop under the task supervisor.
///
/// The loop holds the cache only through a weak reference, upgraded once per
/// tick, and exits when the cache is closed or every handle is dropped.
fn spawn_janitor<T>(weak: Weak<TtlInner<T>>)
where
    T: Clone + Send + Sync + 'static,
{
    spawn_supervised("ttl-janitor", JANITOR_RESTART_BACKOFF, move || {
        let weak = weak.clone();
        async move {
            debug!("janitor started");
            loop {
                let Some(inner) = weak.upgrade() else { break };
                if inner.closed.load(Ordering::Acquire) {
                    break;
                }

                let interval =
                    Duration::from_millis(inner.cleanup_interval_ms.load(Ordering::Acquire));
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = inner.shutdown.notified() => break,
                }
                if inner.closed.load(Ordering::Acquire) {
                    break;
                }

                inner.sweep();
            }
            debug!("janitor exiting");
        }
    });
}

impl<T> TtlInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// One janitor tick: snapshot the map, collect expired keys, batch-delete
    /// them in a single locked pass, and hand the batch to the callback.
    fn sweep(&self) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .map
            .snapshot()
            .into_iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key)
            .collect();

        if expired.is_empty() {
            debug!("sweep: no expired entries");
            return;
        }

        let removed = self.map.remove_batch(&expired);
        info!(count = removed.len(), "sweep: removed expired entries");

        if removed.is_empty() {
            return;
        }
        if let Some(on_expire) = &self.on_expire {
            let batch: HashMap<String, T> = removed
                .into_iter()
                .map(|(key, entry)| (key, entry.value))
                .collect();
            let on_expire = Arc::clone(on_expire);
            // Detached so a slow or panicking callback never stalls the loop.
            tokio::spawn(async move {
                if catch_unwind(AssertUnwindSafe(|| on_expire(batch))).is_err() {
                    error!("expiry callback panicked");
                }
            });
        }
    }
}
