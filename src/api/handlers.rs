//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Handlers go through
//! the [`Cache`] contract only, so a caching-disabled deployment swaps in the
//! no-op implementation without touching this module.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{Cache, NoopCache, TtlCache};
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, ExtendResponse, GetResponse, HealthResponse, LenResponse, SetRequest,
    SetResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The cache behind the capability contract
    pub cache: Arc<dyn Cache<String>>,
}

impl AppState {
    /// Creates a new AppState over any cache implementation.
    pub fn new(cache: Arc<dyn Cache<String>>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Wires in a [`TtlCache`] (spawning its janitor), or [`NoopCache`] when
    /// caching is disabled.
    pub fn from_config(config: &crate::config::Config) -> Self {
        if config.cache_enabled {
            Self::new(Arc::new(TtlCache::new(
                config.default_ttl,
                config.cleanup_interval,
            )))
        } else {
            Self::new(Arc::new(NoopCache::new()))
        }
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair with an optional TTL in seconds.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    match req.ttl {
        Some(secs) => {
            state
                .cache
                .store_with_expire(&req.key, req.value, Duration::from_secs(secs))?
        }
        None => state.cache.store(&req.key, req.value)?,
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value by key; expired or absent keys are a 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .load(&key)
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
///
/// Deletes a key. Deletion is unconditional, so a missing key still succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.cache.delete(&key);

    Json(DeleteResponse::new(key))
}

/// Handler for POST /extend/:key
///
/// Resets a live key's deadline to the default TTL.
pub async fn extend_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<ExtendResponse> {
    let extended = state.cache.extend(&key);

    Json(ExtendResponse::new(key, extended))
}

/// Handler for GET /len
///
/// Returns the raw physical entry count (expired-but-unswept included).
pub async fn len_handler(State(state): State<AppState>) -> Json<LenResponse> {
    Json(LenResponse::new(state.cache.len()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
