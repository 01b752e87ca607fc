//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_CLEANUP_INTERVAL;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL for entries stored without an explicit TTL
    pub default_ttl: Duration,
    /// Janitor cleanup interval (floored to 1s by the cache)
    pub cleanup_interval: Duration,
    /// HTTP server port
    pub server_port: u16,
    /// Whether caching is enabled; when false the no-op cache is wired in
    pub cache_enabled: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Janitor interval in seconds (default: 60)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_ENABLED` - Set to "false" to disable caching (default: true)
    pub fn from_env() -> Self {
        Self {
            default_ttl: Duration::from_secs(
                env::var("DEFAULT_TTL")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
            cleanup_interval: Duration::from_secs(
                env::var("CLEANUP_INTERVAL")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_CLEANUP_INTERVAL.as_secs()),
            ),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            cache_enabled: env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            server_port: 3000,
            cache_enabled: true,
        }
    }
}
