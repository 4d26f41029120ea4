//! Whole-response cache for the global index.
//!
//! Wraps only the `/` route. Stored responses are replayed verbatim until they
//! expire or the store is flushed; post mutations never touch them.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use super::{
    CacheConfig, METRIC_INDEX_FLUSH, METRIC_INDEX_HIT, METRIC_INDEX_MISS,
    keys::IndexKey,
    store::{CachedResponse, MemoryPageCache, PageCache},
};

const MAX_CACHED_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Shared cache state for middleware and the flush endpoint.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<dyn PageCache>,
}

impl CacheState {
    pub fn new(config: CacheConfig, store: Arc<dyn PageCache>) -> Self {
        Self { config, store }
    }

    /// State backed by the default in-process LRU store.
    pub fn in_memory(config: CacheConfig) -> Self {
        let store = Arc::new(MemoryPageCache::new(&config));
        Self::new(config, store)
    }

    /// Evict every cached index page.
    pub fn flush(&self) -> usize {
        let dropped = self.store.clear();
        counter!(METRIC_INDEX_FLUSH).increment(1);
        info!(
            target = "blogvoyage::cache::index",
            dropped, "index cache flushed"
        );
        dropped
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn index_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = IndexKey::from_query(request.uri().query());

    if let Some(cached) = cache.store.get(&key) {
        counter!(METRIC_INDEX_HIT).increment(1);
        debug!(cache = "index", outcome = "hit", page = ?key.page(), "serving cached response");
        return build_response(cached);
    }

    counter!(METRIC_INDEX_MISS).increment(1);
    debug!(cache = "index", outcome = "miss", page = ?key.page(), "rendering index");

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(cache = "index", error = %err, "failed to collect index body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    cache.store.set(key, cached, cache.config.index_ttl);

    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
