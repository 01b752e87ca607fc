//! Background Tasks Module
//!
//! Supervision for the long-running sweep loops owned by the caches.

mod supervisor;

pub use supervisor::spawn_supervised;
