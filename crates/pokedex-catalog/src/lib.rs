//! Paginated, filterable Pokemon catalog backed by PokeAPI
//!
//! The upstream API is slow and rate-sensitive, so every read goes through a
//! TTL cache with per-URL request coalescing, page materialization runs with
//! a bounded number of concurrent fetches, and compound queries are answered
//! from cached indexes instead of re-reading the catalog.
//!
//! ```text
//! PokedexClient
//!   └─ QueryPlanner ── IndexStore (id→name, type→ids)
//!        │                 │
//!        └─ map_concurrent │
//!             └────────────┴─ UpstreamFetcher ── TtlCache + RequestCoalescer
//!                                   └─ UpstreamTransport (reqwest)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pokedex_catalog::{CatalogConfig, PageQuery, PokedexClient};
//!
//! # async fn example() -> pokedex_catalog::Result<()> {
//! let client = PokedexClient::new(CatalogConfig::default())?;
//!
//! // Fire types from Kanto whose name or number contains "char"
//! let page = client
//!     .query_page(&PageQuery::new().generation(1).type_name("fire").search("char"))
//!     .await?;
//! for pokemon in &page.items {
//!     println!("#{} {} {}", pokemon.id, pokemon.name, pokemon.image());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod generation;
pub mod index;
pub mod planner;
pub mod schema;
pub mod transport;
pub mod types;

pub use client::{PokedexClient, ResourceKind};
pub use concurrency::map_concurrent;
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use fetcher::UpstreamFetcher;
pub use generation::{GENERATIONS, Generation, MAX_POKEMON_ID};
pub use index::{CatalogIndex, IndexStore};
pub use planner::{CatalogPage, NormalizedQuery, PageQuery, QueryPlanner};
pub use schema::{EntityRecord, EvolutionChain, EvolutionStage, SpeciesSummary};
pub use transport::{ReqwestTransport, UpstreamResponse, UpstreamTransport};
pub use types::PokemonType;

pub use pokedex_cache::{CacheStats, CancellationToken};
