//! Configuration for the catalog client

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CatalogError, Result};

/// Public PokeAPI endpoint
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

const DEFAULT_SHORT_TTL_SECS: u64 = 5 * 60;
const DEFAULT_LONG_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_CONCURRENCY_LIMIT: usize = 6;
const DEFAULT_PAGE_LIMIT: usize = 24;
const DEFAULT_MAX_PAGE_LIMIT: usize = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Catalog client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Upstream API root, without a trailing slash
    pub base_url: String,

    /// TTL for page results
    pub short_ttl: Duration,

    /// TTL for indexes and single-entity lookups
    pub long_ttl: Duration,

    /// Maximum concurrent upstream fetches while materializing a page
    pub concurrency_limit: usize,

    /// Page size used when the caller gives none
    pub default_page_limit: usize,

    /// Upper clamp for the page size
    pub max_page_limit: usize,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Request timeout
    pub request_timeout: Duration,

    /// User-Agent header sent upstream
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            short_ttl: Duration::from_secs(DEFAULT_SHORT_TTL_SECS),
            long_ttl: Duration::from_secs(DEFAULT_LONG_TTL_SECS),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: format!("pokedex-catalog/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CatalogConfig {
    /// Create configuration from environment variables
    ///
    /// Absent or malformed values fall back to the default for that field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("POKEDEX_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            short_ttl: env_secs("POKEDEX_SHORT_TTL").unwrap_or(defaults.short_ttl),
            long_ttl: env_secs("POKEDEX_LONG_TTL").unwrap_or(defaults.long_ttl),
            concurrency_limit: std::env::var("POKEDEX_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.concurrency_limit),
            default_page_limit: std::env::var("POKEDEX_DEFAULT_PAGE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_page_limit),
            max_page_limit: std::env::var("POKEDEX_MAX_PAGE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_page_limit),
            connect_timeout: env_secs("POKEDEX_CONNECT_TIMEOUT")
                .unwrap_or(defaults.connect_timeout),
            request_timeout: env_secs("POKEDEX_REQUEST_TIMEOUT")
                .unwrap_or(defaults.request_timeout),
            user_agent: std::env::var("POKEDEX_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Point the client at a different upstream root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the page and entity TTLs
    #[must_use]
    pub fn with_ttls(mut self, short_ttl: Duration, long_ttl: Duration) -> Self {
        self.short_ttl = short_ttl;
        self.long_ttl = long_ttl;
        self
    }

    /// Set the number of concurrent upstream fetches per page
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            CatalogError::InvalidConfiguration(format!("base_url {}: {e}", self.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CatalogError::InvalidConfiguration(format!(
                "base_url must be http or https, got {}",
                parsed.scheme()
            )));
        }
        if self.concurrency_limit == 0 {
            return Err(CatalogError::InvalidConfiguration(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }
        if self.max_page_limit == 0 {
            return Err(CatalogError::InvalidConfiguration(
                "max_page_limit must be at least 1".to_string(),
            ));
        }
        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            return Err(CatalogError::InvalidConfiguration(format!(
                "default_page_limit must be within 1..={}",
                self.max_page_limit
            )));
        }
        if self.short_ttl.is_zero() || self.long_ttl.is_zero() {
            return Err(CatalogError::InvalidConfiguration(
                "cache TTLs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.base_url, "https://pokeapi.co/api/v2");
        assert_eq!(config.short_ttl, Duration::from_secs(300));
        assert_eq!(config.long_ttl, Duration::from_secs(86_400));
        assert_eq!(config.concurrency_limit, 6);
        assert_eq!(config.default_page_limit, 24);
        assert_eq!(config.max_page_limit, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let config = CatalogConfig::default().with_base_url("http://127.0.0.1:8080/api/v2/");
        assert_eq!(config.base_url, "http://127.0.0.1:8080/api/v2");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_url = CatalogConfig::default().with_base_url("not a url");
        assert!(matches!(
            bad_url.validate(),
            Err(CatalogError::InvalidConfiguration(_))
        ));

        let bad_scheme = CatalogConfig::default().with_base_url("ftp://example.com");
        assert!(bad_scheme.validate().is_err());

        let no_workers = CatalogConfig::default().with_concurrency_limit(0);
        assert!(no_workers.validate().is_err());

        let oversized = CatalogConfig {
            default_page_limit: 100,
            ..CatalogConfig::default()
        };
        assert!(oversized.validate().is_err());

        let zero_ttl = CatalogConfig::default().with_ttls(Duration::ZERO, Duration::from_secs(1));
        assert!(zero_ttl.validate().is_err());
    }
}
