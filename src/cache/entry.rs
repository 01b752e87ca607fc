//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

/// Saturation point for unrepresentable deadlines, ~30 years out.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Deadline `ttl` from now, saturating instead of overflowing.
///
/// `Instant` additions panic past the platform's representable range, which a
/// caller-supplied TTL (e.g. `u64::MAX` seconds off the wire) can reach. A TTL
/// too large to represent clamps to [`FAR_FUTURE`], effectively never expiring.
fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

// == Cache Entry ==
/// A stored value paired with its absolute expiry instant.
///
/// The entry is owned exclusively by its map slot; readers receive clones.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The stored value
    pub value: T,
    /// Absolute instant at which the entry expires
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    ///
    /// A zero TTL produces an entry that is already expired on the next read.
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: deadline(ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current instant is
    /// greater than or equal to `expires_at`, so a zero-TTL entry misses
    /// immediately.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    // == Refresh ==
    /// Resets the expiry deadline to `ttl` from now, leaving the value untouched.
    pub fn refresh(&mut self, ttl: Duration) {
        self.expires_at = deadline(ttl);
    }

    // == Time Remaining ==
    /// Returns the remaining time before expiry, zero if already expired.
    pub fn time_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
