//! Upstream HTTP transport
//!
//! [`UpstreamTransport`] is the black-box "GET this URL" seam the fetcher
//! depends on. [`ReqwestTransport`] is the production implementation.

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use std::sync::Once;
use std::time::Duration;
use tracing::debug;

/// Raw upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, already decompressed
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Build a response from a status and body
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Fetch-by-URL operation
///
/// Implementations return `Ok` for any HTTP response, including non-2xx.
/// `Err` means no response was obtained.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Issue a GET for `url`
    async fn get(&self, url: &str) -> Result<UpstreamResponse>;
}

static CRYPTO_PROVIDER: Once = Once::new();

/// Install the ring provider for rustls once per process
///
/// reqwest is built without a bundled provider. An already-installed
/// provider is left in place.
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// reqwest-backed transport with a pooled client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a pooled client from the configured timeouts and user agent
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        ensure_crypto_provider();

        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.concurrency_limit.max(1))
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .tcp_nodelay(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UpstreamTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<UpstreamResponse> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CatalogError::upstream(url, None, e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::upstream(url, Some(status), e.to_string()))?;

        Ok(UpstreamResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory transport for unit tests

    use super::{Result, UpstreamResponse, UpstreamTransport};
    use crate::error::CatalogError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    pub(crate) struct MockTransport {
        routes: Mutex<HashMap<String, UpstreamResponse>>,
        calls: Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
        latency: Mutex<Option<Duration>>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn json(&self, url: &str, body: &serde_json::Value) {
            self.respond(url, 200, body.to_string());
        }

        pub(crate) fn respond(&self, url: &str, status: u16, body: impl Into<String>) {
            self.routes
                .lock()
                .insert(url.to_string(), UpstreamResponse::new(status, body.into()));
        }

        pub(crate) fn set_latency(&self, latency: Duration) {
            *self.latency.lock() = Some(latency);
        }

        pub(crate) fn calls(&self, url: &str) -> usize {
            self.calls.lock().get(url).copied().unwrap_or(0)
        }

        pub(crate) fn total_calls(&self) -> usize {
            self.total.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpstreamTransport for MockTransport {
        async fn get(&self, url: &str) -> Result<UpstreamResponse> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.calls.lock().entry(url.to_string()).or_default() += 1;

            let latency = *self.latency.lock();
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            let route = self.routes.lock().get(url).cloned();
            route.ok_or_else(|| CatalogError::upstream(url, None, "connection refused"))
        }
    }
}
