//! Response cache middleware.
//!
//! Serves stored responses for GET requests while they are fresh and stores
//! new `200 OK` responses. Mounted only on routes that opt in.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::{
    CacheConfig,
    keys::ResponseKey,
    store::{CachedResponse, ResponseStore},
};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

/// Shared cache state for one cached route family.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<ResponseStore>,
    /// Namespace for the stored keys, e.g. `index_page`.
    pub prefix: &'static str,
}

impl CacheState {
    pub fn new(config: CacheConfig, prefix: &'static str) -> Self {
        let store = Arc::new(ResponseStore::new(&config));
        Self {
            config,
            store,
            prefix,
        }
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = ResponseKey::for_request(cache.prefix, &request);

    if let Some(cached) = cache.store.get(&key) {
        debug!(cache = cache.prefix, outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    debug!(
        cache = cache.prefix,
        outcome = "miss",
        "cache miss, executing handler"
    );

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let cacheable = response
        .body()
        .size_hint()
        .exact()
        .is_some_and(|len| len <= MAX_CACHED_BODY_BYTES as u64);
    if !cacheable {
        debug!(
            cache = cache.prefix,
            outcome = "skip",
            "response body too large to cache"
        );
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(cache = cache.prefix, error = %err, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let max_age = format!("max-age={}", cache.store.ttl().as_secs());
    if let Ok(value) = HeaderValue::from_str(&max_age) {
        parts.headers.insert(header::CACHE_CONTROL, value);
    }

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter(|(name, _)| *name != header::SET_COOKIE)
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
        stored_at: Instant::now(),
    };
    cache.store.set(key, cached);

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
