//! Cache Module
//!
//! In-memory caching engine: a thread-safe map primitive, a per-key-TTL cache
//! with a background janitor, and a capacity-bounded variant with blocking
//! inserts for backpressure.

mod bounded;
mod entry;
mod map;
mod noop;
mod traits;
mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use bounded::BoundedCache;
pub use entry::CacheEntry;
pub use map::SyncMap;
pub use noop::NoopCache;
pub use traits::Cache;
pub use ttl::{ExpiryCallback, TtlCache, DEFAULT_CLEANUP_INTERVAL, MIN_CLEANUP_INTERVAL};
