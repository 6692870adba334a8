//! Catalog-wide indexes derived from upstream listings
//!
//! Both indexes are built from a single upstream document each and cached
//! as whole values for the long TTL. Expiry rebuilds them wholesale.

use crate::error::Result;
use crate::fetcher::UpstreamFetcher;
use crate::generation::MAX_POKEMON_ID;
use crate::schema::{ListingResponse, TypeResponse, id_from_url};
use crate::types::PokemonType;
use pokedex_cache::{CancellationToken, TtlCache};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const CATALOG_INDEX_KEY: &str = "pokemon-index";

/// Id to name mapping for the whole national dex
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogIndex {
    names: BTreeMap<u32, String>,
}

impl CatalogIndex {
    /// Entries whose URL has no numeric tail are skipped
    pub fn from_listing(listing: &ListingResponse) -> Self {
        let names = listing
            .results
            .iter()
            .filter_map(|entry| Some((id_from_url(&entry.url)?, entry.name.clone())))
            .collect();
        Self { names }
    }

    /// Name as the upstream spells it
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Exact, case-insensitive name lookup
    pub fn id_of(&self, name: &str) -> Option<u32> {
        let needle = name.trim().to_lowercase();
        self.names
            .iter()
            .find(|(_, n)| n.to_lowercase() == needle)
            .map(|(id, _)| *id)
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Entries ascending by id
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

/// Member ids of one type
pub type TypeIds = Arc<BTreeSet<u32>>;

/// Lazily built, TTL-cached indexes
#[derive(Debug)]
pub struct IndexStore {
    fetcher: UpstreamFetcher,
    base_url: String,
    ttl: Duration,
    catalog: TtlCache<Arc<CatalogIndex>>,
    types: TtlCache<TypeIds>,
}

impl IndexStore {
    /// Create an empty store; indexes are fetched on first use and kept
    /// for `ttl`
    pub fn new(fetcher: UpstreamFetcher, base_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            ttl,
            catalog: TtlCache::new(),
            types: TtlCache::new(),
        }
    }

    /// URL of the full national dex listing
    pub fn listing_url(&self) -> String {
        format!("{}/pokemon?limit={MAX_POKEMON_ID}&offset=0", self.base_url)
    }

    /// URL of one type document
    pub fn type_url(&self, kind: PokemonType) -> String {
        format!("{}/type/{kind}", self.base_url)
    }

    /// The id to name index, fetched once per TTL window
    pub async fn catalog_index(&self) -> Result<Arc<CatalogIndex>> {
        self.catalog_index_inner(None).await
    }

    /// Like [`catalog_index`](Self::catalog_index), abandoned once `token`
    /// fires
    pub async fn catalog_index_cancellable(
        &self,
        token: &CancellationToken,
    ) -> Result<Arc<CatalogIndex>> {
        self.catalog_index_inner(Some(token)).await
    }

    /// Member ids of the named type
    ///
    /// The name is validated before any upstream call.
    pub async fn type_ids(&self, type_name: &str) -> Result<TypeIds> {
        let kind = type_name.parse::<PokemonType>()?;
        self.type_ids_inner(kind, None).await
    }

    /// Member ids of an already parsed type
    pub async fn type_ids_for(&self, kind: PokemonType) -> Result<TypeIds> {
        self.type_ids_inner(kind, None).await
    }

    /// Like [`type_ids_for`](Self::type_ids_for), abandoned once `token`
    /// fires
    pub async fn type_ids_cancellable(
        &self,
        kind: PokemonType,
        token: &CancellationToken,
    ) -> Result<TypeIds> {
        self.type_ids_inner(kind, Some(token)).await
    }

    async fn catalog_index_inner(
        &self,
        token: Option<&CancellationToken>,
    ) -> Result<Arc<CatalogIndex>> {
        if let Some(index) = self.catalog.get(CATALOG_INDEX_KEY) {
            return Ok(index);
        }

        let listing: ListingResponse = self.fetch(&self.listing_url(), token).await?;
        let index = Arc::new(CatalogIndex::from_listing(&listing));
        info!(entries = index.len(), "built catalog index");
        self.catalog
            .put(CATALOG_INDEX_KEY, Arc::clone(&index), self.ttl);
        Ok(index)
    }

    async fn type_ids_inner(
        &self,
        kind: PokemonType,
        token: Option<&CancellationToken>,
    ) -> Result<TypeIds> {
        let key = format!("type-{kind}");
        if let Some(ids) = self.types.get(&key) {
            return Ok(ids);
        }

        let response: TypeResponse = self.fetch(&self.type_url(kind), token).await?;
        let ids: TypeIds = Arc::new(
            response
                .pokemon
                .iter()
                .filter_map(|member| member.pokemon.id())
                .collect(),
        );
        debug!(kind = %kind, members = ids.len(), "built type index");
        self.types.put(key, Arc::clone(&ids), self.ttl);
        Ok(ids)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        token: Option<&CancellationToken>,
    ) -> Result<T> {
        match token {
            Some(token) => self.fetcher.fetch_cancellable(url, self.ttl, token).await,
            None => self.fetcher.fetch(url, self.ttl).await,
        }
    }
}
