//! Cached, coalesced JSON fetches
//!
//! Every upstream read goes through [`UpstreamFetcher`]. A URL is fetched at
//! most once per TTL window: a live cache entry answers directly, and
//! concurrent misses on the same URL share one upstream call.

use crate::error::{CatalogError, Result};
use crate::transport::UpstreamTransport;
use pokedex_cache::{CacheStats, CancellationToken, RequestCoalescer, TtlCache};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Parsed upstream document, shared between cache and callers
pub type JsonDocument = Arc<Value>;

/// Cache-first JSON fetcher over an [`UpstreamTransport`]
///
/// Clones share the cache and the coalescer.
#[derive(Clone)]
pub struct UpstreamFetcher {
    transport: Arc<dyn UpstreamTransport>,
    cache: Arc<TtlCache<JsonDocument>>,
    coalescer: RequestCoalescer<JsonDocument, CatalogError>,
}

impl UpstreamFetcher {
    /// Create a fetcher with an empty cache
    pub fn new(transport: Arc<dyn UpstreamTransport>) -> Self {
        Self {
            transport,
            cache: Arc::new(TtlCache::new()),
            coalescer: RequestCoalescer::new(),
        }
    }

    /// Fetch and parse the JSON document at `url`, caching it for `ttl`
    pub async fn fetch_json(&self, url: &str, ttl: Duration) -> Result<JsonDocument> {
        if let Some(document) = self.cache.get(url) {
            debug!(url, "served from cache");
            return Ok(document);
        }

        let transport = Arc::clone(&self.transport);
        let cache = Arc::clone(&self.cache);
        let owned_url = url.to_owned();
        self.coalescer
            .fetch_once(url, move || load(transport, cache, owned_url, ttl))
            .await
    }

    /// Like [`fetch_json`](Self::fetch_json), but the caller stops waiting
    /// when `token` fires. The upstream call itself still completes and
    /// populates the cache.
    pub async fn fetch_json_cancellable(
        &self,
        url: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> Result<JsonDocument> {
        if token.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }
        if let Some(document) = self.cache.get(url) {
            debug!(url, "served from cache");
            return Ok(document);
        }

        let transport = Arc::clone(&self.transport);
        let cache = Arc::clone(&self.cache);
        let owned_url = url.to_owned();
        self.coalescer
            .fetch_once_cancellable(url, move || load(transport, cache, owned_url, ttl), token)
            .await
    }

    /// Fetch `url` and decode it into `T`
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str, ttl: Duration) -> Result<T> {
        let document = self.fetch_json(url, ttl).await?;
        decode(url, &document)
    }

    /// Like [`fetch`](Self::fetch), abandoned once `token` fires
    pub async fn fetch_cancellable<T: DeserializeOwned>(
        &self,
        url: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> Result<T> {
        let document = self.fetch_json_cancellable(url, ttl, token).await?;
        decode(url, &document)
    }

    /// Statistics of the document cache
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of URLs with an upstream call in flight
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }
}

impl std::fmt::Debug for UpstreamFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamFetcher")
            .field("cached", &self.cache.len())
            .field("in_flight", &self.coalescer.in_flight())
            .finish_non_exhaustive()
    }
}

/// Decode a cached document into a typed schema
pub(crate) fn decode<T: DeserializeOwned>(url: &str, document: &Value) -> Result<T> {
    T::deserialize(document).map_err(|e| {
        warn!(url, error = %e, "malformed upstream payload");
        CatalogError::upstream(url, Some(200), format!("malformed payload: {e}"))
    })
}

/// Runs inside the coalesced task: one upstream call, then cache the result
async fn load(
    transport: Arc<dyn UpstreamTransport>,
    cache: Arc<TtlCache<JsonDocument>>,
    url: String,
    ttl: Duration,
) -> Result<JsonDocument> {
    // A fetch that settled between the caller's miss and this task starting
    // has already filled the cache.
    if let Some(document) = cache.get(&url) {
        return Ok(document);
    }

    info!(url = %url, "fetching from upstream");
    let response = transport.get(&url).await.inspect_err(|e| {
        warn!(url = %url, error = %e, "upstream request failed");
    })?;

    if !response.is_success() {
        let text = response.text();
        let message = if text.trim().is_empty() {
            format!("Failed to fetch {url}")
        } else {
            text
        };
        warn!(url = %url, status = response.status, "upstream returned error status");
        return Err(CatalogError::upstream(&url, Some(response.status), message));
    }

    let value: Value = serde_json::from_slice(&response.body).map_err(|e| {
        warn!(url = %url, error = %e, "upstream returned invalid JSON");
        CatalogError::upstream(&url, Some(response.status), format!("invalid JSON: {e}"))
    })?;

    let document = Arc::new(value);
    cache.put(url, Arc::clone(&document), ttl);
    Ok(document)
}
