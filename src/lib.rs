//! Embercache - an in-memory TTL caching engine
//!
//! Provides a per-key-TTL cache with lazy expiry and a background janitor, a
//! capacity-bounded variant with blocking inserts, and an HTTP front end.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{BoundedCache, Cache, NoopCache, TtlCache};
pub use config::Config;
pub use error::{CacheError, Result};
