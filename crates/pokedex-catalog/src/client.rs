//! `PokedexClient`, the entry point for catalog queries and lookups

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::fetcher::UpstreamFetcher;
use crate::generation::{GENERATIONS, Generation, id_range};
use crate::index::IndexStore;
use crate::planner::{CatalogPage, PageQuery, QueryPlanner};
use crate::schema::{
    EntityRecord, EvolutionChain, RawPokemon, RawSpecies, SpeciesSummary, id_from_url,
};
use crate::transport::{ReqwestTransport, UpstreamTransport};
use crate::types::PokemonType;
use pokedex_cache::{CacheStats, CancellationToken};
use rand::{rng, seq::SliceRandom};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What a response contains, for freshness hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A page of catalog results
    Page,
    /// A single Pokemon record
    Pokemon,
    /// A species summary
    Species,
    /// An evolution chain
    EvolutionChain,
}

/// Catalog client
///
/// Owns its caches and coalescer; clones share them. Separate instances
/// share nothing.
#[derive(Debug, Clone)]
pub struct PokedexClient {
    config: Arc<CatalogConfig>,
    fetcher: UpstreamFetcher,
    indexes: Arc<IndexStore>,
    planner: Arc<QueryPlanner>,
}

impl PokedexClient {
    /// Create a client talking to the configured upstream over HTTPS
    pub fn new(config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client from `POKEDEX_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(CatalogConfig::from_env())
    }

    /// Create a client over a custom transport
    pub fn with_transport(
        config: CatalogConfig,
        transport: Arc<dyn UpstreamTransport>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let fetcher = UpstreamFetcher::new(transport);
        let indexes = Arc::new(IndexStore::new(
            fetcher.clone(),
            config.base_url.clone(),
            config.long_ttl,
        ));
        let planner = Arc::new(QueryPlanner::new(
            Arc::clone(&config),
            fetcher.clone(),
            Arc::clone(&indexes),
        ));

        Ok(Self {
            config,
            fetcher,
            indexes,
            planner,
        })
    }

    /// Configuration this client was built with
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// One page of the filtered catalog
    pub async fn query_page(&self, query: &PageQuery) -> Result<CatalogPage> {
        self.planner.query_page(query).await
    }

    /// One page of the filtered catalog, abandoned once `token` fires
    pub async fn query_page_cancellable(
        &self,
        query: &PageQuery,
        token: &CancellationToken,
    ) -> Result<CatalogPage> {
        self.planner.query_page_cancellable(query, token).await
    }

    /// Single Pokemon by national dex id
    pub async fn get_pokemon(&self, id: u32) -> Result<EntityRecord> {
        let url = self.planner.entity_url(id);
        let raw: RawPokemon = self
            .fetcher
            .fetch(&url, self.config.long_ttl)
            .await
            .map_err(not_found(format!("pokemon/{id}")))?;
        Ok(EntityRecord::from(raw))
    }

    /// Single Pokemon by name, case-insensitive
    ///
    /// Names present in the catalog index resolve to their id so both lookup
    /// styles share one cache entry. Other names (alternate forms) are
    /// fetched by name. A name that is empty or holds anything besides ASCII
    /// letters, digits and `-` is `NotFound` without any upstream call.
    pub async fn get_pokemon_by_name(&self, name: &str) -> Result<EntityRecord> {
        let name = name.trim().to_lowercase();
        if !is_resource_name(&name) {
            return Err(CatalogError::NotFound {
                resource: format!("pokemon/{name}"),
            });
        }
        if let Ok(id) = name.parse::<u32>() {
            return self.get_pokemon(id).await;
        }

        let index = self.indexes.catalog_index().await?;
        if let Some(id) = index.id_of(&name) {
            return self.get_pokemon(id).await;
        }

        debug!(name = %name, "name not in catalog index, fetching directly");
        let url = format!("{}/pokemon/{name}", self.config.base_url);
        let raw: RawPokemon = self
            .fetcher
            .fetch(&url, self.config.long_ttl)
            .await
            .map_err(not_found(format!("pokemon/{name}")))?;
        Ok(EntityRecord::from(raw))
    }

    /// Species summary by national dex id
    pub async fn get_species(&self, id: u32) -> Result<SpeciesSummary> {
        let url = format!("{}/pokemon-species/{id}", self.config.base_url);
        let raw: RawSpecies = self
            .fetcher
            .fetch(&url, self.config.long_ttl)
            .await
            .map_err(not_found(format!("pokemon-species/{id}")))?;
        Ok(SpeciesSummary::from(raw))
    }

    /// Evolution chain by chain id
    pub async fn get_evolution_chain(&self, id: u32) -> Result<EvolutionChain> {
        let url = format!("{}/evolution-chain/{id}", self.config.base_url);
        self.fetcher
            .fetch(&url, self.config.long_ttl)
            .await
            .map_err(not_found(format!("evolution-chain/{id}")))
    }

    /// Evolution chain from the URL carried by a species record
    pub async fn get_evolution_chain_by_url(&self, url: &str) -> Result<EvolutionChain> {
        let id = id_from_url(url).ok_or_else(|| CatalogError::NotFound {
            resource: url.to_string(),
        })?;
        self.get_evolution_chain(id).await
    }

    /// The nine generations in order
    pub fn generations(&self) -> &'static [Generation] {
        &GENERATIONS
    }

    /// The 18 types in canonical order
    pub fn types(&self) -> &'static [PokemonType] {
        &PokemonType::ALL
    }

    /// Up to `count` distinct random ids from a generation, or the whole dex
    pub fn random_ids(&self, count: usize, generation: Option<u32>) -> Result<Vec<u32>> {
        let mut ids: Vec<u32> = id_range(generation)?.collect();
        ids.shuffle(&mut rng());
        ids.truncate(count);
        Ok(ids)
    }

    /// Statistics of the upstream document cache
    pub fn cache_stats(&self) -> CacheStats {
        self.fetcher.cache_stats()
    }

    /// Statistics of the page result cache
    pub fn page_cache_stats(&self) -> CacheStats {
        self.planner.page_cache_stats()
    }

    /// Upstream fetches currently in flight
    pub fn in_flight(&self) -> usize {
        self.fetcher.in_flight()
    }

    /// How long a response of this kind stays fresh
    pub fn freshness(&self, kind: ResourceKind) -> Duration {
        match kind {
            ResourceKind::Page => self.config.short_ttl,
            ResourceKind::Pokemon | ResourceKind::Species | ResourceKind::EvolutionChain => {
                self.config.long_ttl
            }
        }
    }

    /// `Cache-Control` header value for a response of this kind
    pub fn cache_control(&self, kind: ResourceKind) -> String {
        let secs = self.freshness(kind).as_secs();
        format!("public, max-age={secs}")
    }
}

/// Upstream resource names are lowercase ASCII, digits and hyphens
fn is_resource_name(name: &str) -> bool {
    let allowed = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-';
    !name.is_empty() && name.bytes().all(allowed)
}

/// Turn an upstream 404 into `NotFound` for the given resource
fn not_found(resource: String) -> impl FnOnce(CatalogError) -> CatalogError {
    move |err| match err {
        CatalogError::Upstream {
            status: Some(404),
            ..
        } => CatalogError::NotFound { resource },
        other => other,
    }
}
