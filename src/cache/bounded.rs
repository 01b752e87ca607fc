//! Bounded Cache Module
//!
//! Capacity-limited TTL cache with a blocking-with-timeout insert for
//! backpressure. Keeps its own plain map and lock plus an atomic live count,
//! and runs an independent sweep loop on a fixed one-minute ticker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::cache::CacheEntry;
use crate::tasks::spawn_supervised;

// == Constants ==
/// Fixed interval between sweep passes.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Backoff before the sweeper is respawned after a panic.
const SWEEP_RESTART_BACKOFF: Duration = Duration::from_secs(5);

/// Poll interval for [`BoundedCache::set_with_hold`].
const HOLD_RETRY_INTERVAL: Duration = Duration::from_millis(300);

// == Bounded Cache ==
/// TTL cache enforcing a maximum live-entry count.
///
/// Cloning yields another handle to the same cache. There is no terminal
/// state: the sweeper runs until every handle is dropped. Capacity exhaustion
/// is signaled as a plain `bool` to keep the hot path cheap.
pub struct BoundedCache<T> {
    inner: Arc<BoundedInner<T>>,
}

impl<T> Clone for BoundedCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct BoundedInner<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    /// Live-entry count, readable without the lock. Adjusted per mutation and
    /// recomputed from the map during each sweep to bound drift.
    live: AtomicUsize,
    /// Maximum entries; 0 means unbounded.
    capacity: usize,
}

impl<T> BoundedInner<T> {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// One sweep pass: drop expired entries and recompute the live counter
    /// from the map under a single write lock.
    fn sweep(&self) {
        let mut guard = self.write();
        let before = guard.len();
        let now = Instant::now();
        guard.retain(|_, entry| entry.expires_at > now);
        let after = guard.len();
        self.live.store(after, Ordering::Release);

        if before > after {
            info!(removed = before - after, "bounded sweep: removed expired entries");
        } else {
            debug!("bounded sweep: no expired entries");
        }
    }
}

impl<T> BoundedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` live entries (0 = unbounded)
    /// and spawns its sweep loop. Must be called inside a tokio runtime.
    pub fn new(capacity: usize) -> Self {
        let inner = Arc::new(BoundedInner {
            entries: RwLock::new(HashMap::new()),
            live: AtomicUsize::new(0),
            capacity,
        });

        spawn_sweeper(Arc::downgrade(&inner));

        Self { inner }
    }

    // == Set ==
    /// Inserts or overwrites an entry expiring `ttl` from now.
    ///
    /// Returns `false` immediately when the cache is at capacity; never
    /// blocks. Overwriting an existing key always succeeds. Empty keys are
    /// rejected.
    pub fn set(&self, key: &str, value: T, ttl: Duration) -> bool {
        if key.is_empty() {
            return false;
        }
        let mut guard = self.inner.write();
        if let Some(entry) = guard.get_mut(key) {
            *entry = CacheEntry::new(value, ttl);
            return true;
        }
        if self.inner.capacity != 0 && guard.len() >= self.inner.capacity {
            // Full by raw count: purge expired slots under the same lock
            // before giving up, so natural expiry frees capacity without
            // waiting for the sweeper.
            let now = Instant::now();
            guard.retain(|_, entry| entry.expires_at > now);
            self.inner.live.store(guard.len(), Ordering::Release);
            if guard.len() >= self.inner.capacity {
                return false;
            }
        }
        guard.insert(key.to_string(), CacheEntry::new(value, ttl));
        self.inner.live.fetch_add(1, Ordering::AcqRel);
        true
    }

    // == Set With Hold ==
    /// Polls [`BoundedCache::set`] every 300 ms until it succeeds or `timeout`
    /// elapses. A `false` return means "gave up", never "stored".
    ///
    /// This is a bounded-latency polling primitive, not an event-driven wait:
    /// a freed slot is observed with up to one poll interval of delay.
    pub async fn set_with_hold(&self, key: &str, value: T, ttl: Duration, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.set(key, value.clone(), ttl) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(HOLD_RETRY_INTERVAL.min(deadline - now)).await;
        }
    }

    // == Get ==
    /// Returns a copy of the value if present and unexpired. An
    /// expired-but-unswept entry is a miss and is left for the sweeper.
    pub fn get(&self, key: &str) -> Option<T> {
        self.inner
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    // == Get And Expire ==
    /// Reads a value and refreshes its deadline to `new_ttl` on a hit.
    ///
    /// Unlike [`BoundedCache::get`], a found-but-expired slot is physically
    /// deleted here rather than left for the sweeper.
    pub fn get_and_expire(&self, key: &str, new_ttl: Duration) -> Option<T> {
        let mut guard = self.inner.write();
        match guard.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                guard.remove(key);
                self.inner.live.fetch_sub(1, Ordering::AcqRel);
                None
            }
            Some(entry) => {
                entry.refresh(new_ttl);
                Some(entry.value.clone())
            }
            None => None,
        }
    }

    // == Get And Remove ==
    /// Unconditionally deletes the slot, returning the value only if it was
    /// still live at removal time.
    pub fn get_and_remove(&self, key: &str) -> Option<T> {
        let mut guard = self.inner.write();
        match guard.remove(key) {
            Some(entry) => {
                // Decrement while still holding the guard: a sweep slotted in
                // between would recompute from the shrunk map and the late
                // decrement would wrap the counter.
                self.inner.live.fetch_sub(1, Ordering::AcqRel);
                (!entry.is_expired()).then_some(entry.value)
            }
            None => None,
        }
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        let mut guard = self.inner.write();
        guard.clear();
        self.inner.live.store(0, Ordering::Release);
    }

    // == Length ==
    /// Live-entry count from the atomic counter, readable without the lock.
    /// May briefly include expired-but-unswept entries; the sweeper recomputes
    /// it from the map each pass.
    pub fn len(&self) -> usize {
        self.inner.live.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured maximum; 0 means unbounded.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    #[cfg(test)]
    fn sweep_now(&self) {
        self.inner.sweep();
    }
}

// == Sweeper ==
/// Fixed-interval sweep loop under the task supervisor. Holds the cache only
/// weakly and exits once every user handle is dropped.
fn spawn_sweeper<T>(weak: Weak<BoundedInner<T>>)
where
    T: Send + Sync + 'static,
{
    spawn_supervised("bounded-sweeper", SWEEP_RESTART_BACKOFF, move || {
        let weak = weak.clone();
        async move {
            loop {
                tokio::time::sleep(SWEEP_INTERVAL).await;
                let Some(inner) = weak.upgrade() else { break };
                inner.sweep();
            }
        }
    });
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = BoundedCache::new(10);

        assert!(cache.set("key1", "value1".to_string(), Duration::from_secs(60)));

        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_bound() {
        let cache = BoundedCache::new(2);

        assert!(cache.set("a", 1u32, Duration::from_secs(60)));
        assert!(cache.set("b", 2u32, Duration::from_secs(60)));
        assert!(!cache.set("c", 3u32, Duration::from_secs(60)));

        // Overwrites never count against capacity.
        assert!(cache.set("a", 10u32, Duration::from_secs(60)));

        // Freeing a slot lets the next set through.
        cache.get_and_remove("b");
        assert!(cache.set("c", 3u32, Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_zero_capacity_is_unbounded() {
        let cache = BoundedCache::new(0);

        for i in 0..100 {
            assert!(cache.set(&format!("key{}", i), i, Duration::from_secs(60)));
        }
        assert_eq!(cache.len(), 100);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let cache = BoundedCache::new(10);

        assert!(!cache.set("", 1u32, Duration::from_secs(60)));
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = BoundedCache::new(10);
        cache.set("key1", "v".to_string(), Duration::from_millis(40));

        tokio::time::sleep(Duration::from_millis(60)).await;

        // Miss, but the slot is left for the sweeper.
        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_get_and_expire_refreshes_deadline() {
        let cache = BoundedCache::new(10);
        cache.set("key1", "v".to_string(), Duration::from_millis(50));

        assert_eq!(
            cache.get_and_expire("key1", Duration::from_secs(10)),
            Some("v".to_string())
        );

        tokio::time::sleep(Duration::from_millis(80)).await;

        // Still alive on the refreshed deadline.
        assert_eq!(cache.get("key1"), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_get_and_expire_deletes_expired_slot() {
        let cache = BoundedCache::new(10);
        cache.set("key1", "v".to_string(), Duration::ZERO);

        assert_eq!(cache.get_and_expire("key1", Duration::from_secs(10)), None);
        // Deleted physically, unlike the plain get path.
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_get_and_remove() {
        let cache = BoundedCache::new(10);
        cache.set("live", "v".to_string(), Duration::from_secs(60));
        cache.set("dead", "v".to_string(), Duration::ZERO);

        assert_eq!(cache.get_and_remove("live"), Some("v".to_string()));
        // Expired at removal time: slot deleted, value withheld.
        assert_eq!(cache.get_and_remove("dead"), None);
        assert_eq!(cache.get_and_remove("missing"), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_len_consistent_under_concurrent_removal_and_sweep() {
        let cache = BoundedCache::new(0);
        for i in 0..200 {
            cache.set(&format!("k{}", i), i, Duration::from_secs(60));
        }

        let sweeper = cache.clone();
        let handle = std::thread::spawn(move || {
            for _ in 0..200 {
                sweeper.sweep_now();
            }
        });
        for i in 0..200 {
            cache.get_and_remove(&format!("k{}", i));
        }
        handle.join().unwrap();

        // Every decrement happens under the write lock, so interleaved
        // recomputes can never wrap the counter.
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = BoundedCache::new(10);
        cache.set("key1", 1u32, Duration::from_secs(60));
        cache.set("key2", 2u32, Duration::from_secs(60));

        cache.clear();

        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.get("key1"), None);
    }

    #[tokio::test]
    async fn test_sweep_recomputes_counter() {
        let cache = BoundedCache::new(10);
        cache.set("short", 1u32, Duration::from_millis(30));
        cache.set("long", 2u32, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.len(), 2);

        cache.sweep_now();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[tokio::test]
    async fn test_natural_expiry_frees_capacity() {
        let cache = BoundedCache::new(1);
        cache.set("old", 1u32, Duration::from_millis(30));

        tokio::time::sleep(Duration::from_millis(50)).await;

        // The full-path purge reclaims the expired slot without a sweep.
        assert!(cache.set("new", 2u32, Duration::from_secs(60)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("old"), None);
    }

    #[tokio::test]
    async fn test_set_with_hold_succeeds_when_slot_frees() {
        let cache = BoundedCache::new(1);
        cache.set("blocker", 1u32, Duration::from_secs(60));

        let waiter = cache.clone();
        let handle = tokio::spawn(async move {
            waiter
                .set_with_hold("next", 2u32, Duration::from_secs(60), Duration::from_secs(5))
                .await
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        cache.get_and_remove("blocker");

        assert!(handle.await.unwrap());
        assert_eq!(cache.get("next"), Some(2));
    }

    #[tokio::test]
    async fn test_set_with_hold_times_out() {
        let cache = BoundedCache::new(1);
        cache.set("blocker", 1u32, Duration::from_secs(60));

        let stored = cache
            .set_with_hold("next", 2u32, Duration::from_secs(60), Duration::from_millis(500))
            .await;

        assert!(!stored, "timeout must report gave-up, not stored");
        assert_eq!(cache.get("next"), None);
    }
}
