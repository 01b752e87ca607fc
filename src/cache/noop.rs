//! No-op Cache Module
//!
//! A [`Cache`] implementation that caches nothing, for configurations where
//! caching is disabled. Stores succeed and are discarded; every read misses.

use std::time::Duration;

use crate::cache::Cache;
use crate::error::Result;

// == Noop Cache ==
/// Cache that never retains anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl NoopCache {
    pub fn new() -> Self {
        Self
    }
}

impl<T: Clone> Cache<T> for NoopCache {
    fn close(&self) {}

    fn clear(&self) {}

    fn len(&self) -> usize {
        0
    }

    fn extend(&self, _key: &str) -> bool {
        false
    }

    fn store(&self, _key: &str, _value: T) -> Result<()> {
        Ok(())
    }

    fn store_with_expire(&self, _key: &str, _value: T, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn load(&self, _key: &str) -> Option<T> {
        None
    }

    fn load_or_store(&self, _key: &str, value: T) -> (T, bool) {
        (value, false)
    }

    fn delete(&self, _key: &str) {}

    fn for_each(&self, _f: &mut dyn FnMut(&str, &T)) {}
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_store_succeeds_but_discards() {
        let cache = NoopCache::new();

        Cache::store(&cache, "key1", "value1".to_string()).unwrap();

        assert_eq!(Cache::<String>::load(&cache, "key1"), None);
        assert_eq!(Cache::<String>::len(&cache), 0);
    }

    #[test]
    fn test_noop_load_or_store_always_inserts_nothing() {
        let cache = NoopCache::new();

        let (value, found) = cache.load_or_store("key1", 42u32);

        assert_eq!(value, 42);
        assert!(!found);
        assert_eq!(Cache::<u32>::load(&cache, "key1"), None);
    }

    #[test]
    fn test_noop_extend_misses() {
        let cache = NoopCache::new();

        assert!(!Cache::<String>::extend(&cache, "key1"));
    }
}
