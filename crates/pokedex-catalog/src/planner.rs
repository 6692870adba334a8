//! Compound catalog queries
//!
//! A query is answered in three steps: compute the ordered candidate ids
//! from the generation range and the type/name indexes, slice the requested
//! page, then fetch only the entities on that page.

use crate::concurrency::map_concurrent;
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::fetcher::UpstreamFetcher;
use crate::generation::id_range;
use crate::index::IndexStore;
use crate::schema::{EntityRecord, RawPokemon};
use crate::types::PokemonType;
use pokedex_cache::{CacheStats, CancellationToken, TtlCache};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Caller-facing page request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// Restrict to one generation (1-9)
    pub generation: Option<u32>,
    /// Restrict to one type, matched case-insensitively
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    /// Name substring or dex number fragment
    pub search: Option<String>,
    /// 1-based; values below 1 are treated as 1
    pub page: Option<usize>,
    /// Absent means the configured default page size. An explicit 0 is
    /// clamped up to 1 rather than replaced by the default.
    pub limit: Option<usize>,
}

impl PageQuery {
    /// Query for the first page of the whole catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the generation filter
    #[must_use]
    pub const fn generation(mut self, generation: u32) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Set the type filter
    #[must_use]
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Set the search text
    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Set the 1-based page number
    #[must_use]
    pub const fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page size
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Validated query with defaults and clamps applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    /// Validated generation number
    pub generation: Option<u32>,
    /// Parsed type filter
    pub kind: Option<PokemonType>,
    /// Trimmed and lowercased; `None` when blank
    pub search: Option<String>,
    /// 1-based page number
    pub page: usize,
    /// Page size within `1..=max_page_limit`
    pub limit: usize,
}

impl NormalizedQuery {
    /// Half-open index window of this page into the candidate list
    pub fn window(&self, total: usize) -> std::ops::Range<usize> {
        let skipped = self.page.saturating_sub(1);
        let start = skipped.saturating_mul(self.limit).min(total);
        let end = start.saturating_add(self.limit).min(total);
        start..end
    }

    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NormalizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page:gen=")?;
        if let Some(generation) = self.generation {
            write!(f, "{generation}")?;
        }
        write!(f, ":type=")?;
        if let Some(kind) = self.kind {
            write!(f, "{kind}")?;
        }
        write!(
            f,
            ":search={}:page={}:limit={}",
            self.search.as_deref().unwrap_or_default(),
            self.page,
            self.limit
        )
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// Matches before pagination
    pub total: usize,
    /// At most `limit` records, ascending by id
    pub items: Vec<EntityRecord>,
}

/// Answers page queries from the indexes and the entity cache
///
/// Finished pages are kept for the short TTL. Expired pages are swept
/// whenever a new page is stored.
#[derive(Debug)]
pub struct QueryPlanner {
    config: Arc<CatalogConfig>,
    fetcher: UpstreamFetcher,
    indexes: Arc<IndexStore>,
    pages: TtlCache<Arc<CatalogPage>>,
}

impl QueryPlanner {
    /// Create a planner over shared indexes and fetcher
    pub fn new(
        config: Arc<CatalogConfig>,
        fetcher: UpstreamFetcher,
        indexes: Arc<IndexStore>,
    ) -> Self {
        Self {
            config,
            fetcher,
            indexes,
            pages: TtlCache::new(),
        }
    }

    /// Validate and apply defaults. Never touches the upstream.
    pub fn normalize(&self, query: &PageQuery) -> Result<NormalizedQuery> {
        if let Some(generation) = query.generation {
            id_range(Some(generation))?;
        }
        let kind = query
            .type_name
            .as_deref()
            .map(str::parse::<PokemonType>)
            .transpose()?;
        let search = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let limit = query
            .limit
            .unwrap_or(self.config.default_page_limit)
            .clamp(1, self.config.max_page_limit.max(1));

        Ok(NormalizedQuery {
            generation: query.generation,
            kind,
            search,
            page: query.page.unwrap_or(1).max(1),
            limit,
        })
    }

    /// One page of the filtered catalog
    pub async fn query_page(&self, query: &PageQuery) -> Result<CatalogPage> {
        self.run(query, None).await
    }

    /// Like [`query_page`](Self::query_page), but returns `Cancelled` once
    /// `token` fires. Upstream fetches already started keep running and
    /// still fill the cache.
    pub async fn query_page_cancellable(
        &self,
        query: &PageQuery,
        token: &CancellationToken,
    ) -> Result<CatalogPage> {
        self.run(query, Some(token)).await
    }

    /// Ordered ids matching the filters, before pagination
    pub async fn candidates(
        &self,
        query: &NormalizedQuery,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<u32>> {
        let mut ids: Vec<u32> = id_range(query.generation)?.collect();

        if let Some(kind) = query.kind {
            let members = match token {
                Some(token) => self.indexes.type_ids_cancellable(kind, token).await?,
                None => self.indexes.type_ids_for(kind).await?,
            };
            ids.retain(|id| members.contains(id));
        }

        if let Some(search) = query.search.as_deref() {
            if search.bytes().all(|b| b.is_ascii_digit()) {
                ids.retain(|id| id.to_string().contains(search));
            } else {
                let index = match token {
                    Some(token) => self.indexes.catalog_index_cancellable(token).await?,
                    None => self.indexes.catalog_index().await?,
                };
                ids.retain(|id| {
                    id.to_string().contains(search)
                        || index
                            .name(*id)
                            .is_some_and(|name| name.to_lowercase().contains(search))
                });
            }
        }

        Ok(ids)
    }

    /// Statistics of the page result cache
    pub fn page_cache_stats(&self) -> CacheStats {
        self.pages.stats()
    }

    /// Upstream URL of one entity document
    pub fn entity_url(&self, id: u32) -> String {
        format!("{}/pokemon/{id}", self.config.base_url)
    }

    async fn run(
        &self,
        query: &PageQuery,
        token: Option<&CancellationToken>,
    ) -> Result<CatalogPage> {
        let normalized = self.normalize(query)?;
        if token.is_some_and(CancellationToken::is_cancelled) {
            return Err(CatalogError::Cancelled);
        }

        let key = normalized.cache_key();
        if let Some(page) = self.pages.get(&key) {
            debug!(key = %key, "page served from cache");
            return Ok(CatalogPage::clone(&page));
        }

        let candidates = self.candidates(&normalized, token).await?;
        let total = candidates.len();
        let window = &candidates[normalized.window(total)];

        let items = map_concurrent(window, self.config.concurrency_limit, |&id| {
            self.entity(id, token)
        })
        .await?;

        info!(
            key = %key,
            total,
            items = items.len(),
            "materialized catalog page"
        );
        let page = CatalogPage { total, items };

        let purged = self.pages.purge_expired();
        if purged > 0 {
            debug!(purged, "purged expired pages");
        }
        self.pages
            .put(key, Arc::new(page.clone()), self.config.short_ttl);
        Ok(page)
    }

    async fn entity(&self, id: u32, token: Option<&CancellationToken>) -> Result<EntityRecord> {
        let url = self.entity_url(id);
        let raw: RawPokemon = match token {
            Some(token) => {
                self.fetcher
                    .fetch_cancellable(&url, self.config.long_ttl, token)
                    .await?
            }
            None => self.fetcher.fetch(&url, self.config.long_ttl).await?,
        };
        Ok(EntityRecord::from(raw))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::UpstreamTransport;
    use crate::transport::mock::MockTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    const BASE: &str = "http://upstream.test/api/v2";

    fn planner(transport: &Arc<MockTransport>) -> QueryPlanner {
        let config = Arc::new(CatalogConfig::default().with_base_url(BASE));
        let fetcher = UpstreamFetcher::new(Arc::clone(transport) as Arc<dyn UpstreamTransport>);
        let indexes = Arc::new(IndexStore::new(fetcher.clone(), BASE, config.long_ttl));
        QueryPlanner::new(config, fetcher, indexes)
    }

    fn serve_entities(transport: &MockTransport, ids: impl IntoIterator<Item = u32>) {
        for id in ids {
            transport.json(
                &format!("{BASE}/pokemon/{id}"),
                &json!({ "id": id, "name": format!("mon-{id}") }),
            );
        }
    }

    fn query(page: usize, limit: usize) -> NormalizedQuery {
        NormalizedQuery {
            generation: None,
            kind: None,
            search: None,
            page,
            limit,
        }
    }

    #[test]
    fn test_normalize_defaults_and_clamps() {
        let transport = Arc::new(MockTransport::new());
        let planner = planner(&transport);

        let q = planner.normalize(&PageQuery::new()).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 24);

        let q = planner
            .normalize(&PageQuery::new().page(0).limit(0))
            .unwrap();
        assert_eq!((q.page, q.limit), (1, 1));

        let q = planner.normalize(&PageQuery::new().limit(500)).unwrap();
        assert_eq!(q.limit, 60);

        let q = planner
            .normalize(&PageQuery::new().type_name("FIRE").search("  Char "))
            .unwrap();
        assert_eq!(q.kind, Some(PokemonType::Fire));
        assert_eq!(q.search.as_deref(), Some("char"));

        let q = planner.normalize(&PageQuery::new().search("   ")).unwrap();
        assert_eq!(q.search, None);
    }

    #[test]
    fn test_window() {
        let q = query(7, 24);
        assert_eq!(q.window(151), 144..151);
        assert_eq!(q.window(100), 100..100);

        assert_eq!(query(usize::MAX, 24).window(151), 151..151);
    }

    #[test]
    fn test_window_page_zero_reads_first_page() {
        assert_eq!(query(0, 24).window(151), 0..24);
        assert_eq!(query(0, 24).window(5), 0..5);
    }

    #[test]
    fn test_cache_key_distinguishes_queries() {
        let base = query(1, 24);
        let fire = NormalizedQuery {
            kind: Some(PokemonType::Fire),
            ..base.clone()
        };
        assert_eq!(base.cache_key(), "page:gen=:type=:search=:page=1:limit=24");
        assert_ne!(base.cache_key(), fire.cache_key());
    }

    #[tokio::test]
    async fn test_invalid_inputs_fail_before_upstream() {
        let transport = Arc::new(MockTransport::new());
        let planner = planner(&transport);

        let err = planner
            .query_page(&PageQuery::new().generation(10))
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::InvalidGeneration(10));

        let err = planner
            .query_page(&PageQuery::new().type_name("shadow"))
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::InvalidType("shadow".to_string()));

        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_numeric_search_skips_name_index() {
        let transport = Arc::new(MockTransport::new());
        serve_entities(&transport, [25, 125, 250, 251]);
        let planner = planner(&transport);

        let page = planner
            .query_page(&PageQuery::new().generation(1).search("25"))
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        let ids: Vec<u32> = page.items.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![25, 125]);
        assert_eq!(transport.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_name_search_ignores_upstream_case() {
        let transport = Arc::new(MockTransport::new());
        let planner = planner(&transport);
        transport.json(
            &planner.indexes.listing_url(),
            &json!({
                "count": 4,
                "results": [
                    { "name": "Bulbasaur", "url": format!("{BASE}/pokemon/1/") },
                    { "name": "charmander", "url": format!("{BASE}/pokemon/4/") },
                    { "name": "Charizard", "url": format!("{BASE}/pokemon/6/") },
                    { "name": "PIKACHU", "url": format!("{BASE}/pokemon/25/") }
                ]
            }),
        );
        serve_entities(&transport, [4, 6, 25]);

        let page = planner
            .query_page(&PageQuery::new().search("CHAR"))
            .await
            .unwrap();
        let ids: Vec<u32> = page.items.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 6]);

        let page = planner
            .query_page(&PageQuery::new().search("pika"))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, 25);
    }

    #[tokio::test]
    async fn test_partial_failure_fails_page() {
        let transport = Arc::new(MockTransport::new());
        serve_entities(&transport, [1, 2, 4, 5]);
        transport.respond(&format!("{BASE}/pokemon/3"), 500, "boom");
        let planner = planner(&transport);

        let err = planner
            .query_page(&PageQuery::new().generation(1).limit(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Upstream { .. }));
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_repeat_query_served_from_page_cache() {
        let transport = Arc::new(MockTransport::new());
        serve_entities(&transport, 1..=3);
        let planner = planner(&transport);
        let query = PageQuery::new().generation(1).limit(3);

        let first = planner.query_page(&query).await.unwrap();
        let second = planner.query_page(&query).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(planner.page_cache_stats().hits, 1);
        assert_eq!(transport.total_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_pages_are_reclaimed() {
        let transport = Arc::new(MockTransport::new());
        serve_entities(&transport, 1..=4);
        let planner = planner(&transport);
        let page_of_one = |page| PageQuery::new().generation(1).limit(1).page(page);

        for page in 1..=3 {
            planner.query_page(&page_of_one(page)).await.unwrap();
        }
        assert_eq!(planner.page_cache_stats().entries, 3);

        tokio::time::advance(Duration::from_secs(301)).await;

        // Storing a new page sweeps the expired ones
        planner.query_page(&page_of_one(4)).await.unwrap();
        let stats = planner.page_cache_stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.expired, 3);

        // An expired page is rebuilt from the still-live entity cache
        let page = planner.query_page(&page_of_one(1)).await.unwrap();
        assert_eq!(page.items[0].id, 1);
        assert_eq!(planner.page_cache_stats().hits, 0);
        assert_eq!(transport.total_calls(), 4);
    }

    #[tokio::test]
    async fn test_pre_cancelled_query_does_no_work() {
        let transport = Arc::new(MockTransport::new());
        let planner = planner(&transport);
        let token = CancellationToken::new();
        token.cancel();

        let err = planner
            .query_page_cancellable(&PageQuery::new(), &token)
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::Cancelled);
        assert_eq!(transport.total_calls(), 0);
    }
}
