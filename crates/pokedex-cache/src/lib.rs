//! TTL caching and request coalescing for upstream API aggregation
//!
//! Two primitives sit between an application and a slow upstream:
//!
//! - [`TtlCache`]: a string-keyed in-memory map where each entry carries its
//!   own expiry. Expired entries are evicted lazily on lookup.
//! - [`RequestCoalescer`]: at most one in-flight producer per key. Callers
//!   arriving while a fetch is running await the same result.
//!
//! A [`CancellationToken`] lets a single caller stop waiting on a coalesced
//! fetch without affecting the fetch itself.
//!
//! ```text
//! caller ──► TtlCache ──hit──► value
//!               │
//!              miss
//!               ▼
//!        RequestCoalescer ──joined──► shared result
//!               │
//!             started
//!               ▼
//!           producer ──► TtlCache::put ──► slot released
//! ```
//!
//! # Example
//!
//! ```rust
//! use pokedex_cache::{CacheError, RequestCoalescer, TtlCache};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), CacheError> {
//! let cache: Arc<TtlCache<u32>> = Arc::new(TtlCache::new());
//! let coalescer: RequestCoalescer<u32, CacheError> = RequestCoalescer::new();
//!
//! let value = match cache.get("answer") {
//!     Some(value) => value,
//!     None => {
//!         let cache = Arc::clone(&cache);
//!         coalescer
//!             .fetch_once("answer", move || async move {
//!                 cache.put("answer", 42, Duration::from_secs(300));
//!                 Ok(42)
//!             })
//!             .await?
//!     }
//! };
//! assert_eq!(value, 42);
//! assert_eq!(cache.get("answer"), Some(42));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cancel;
pub mod coalesce;
pub mod error;
pub mod stats;
pub mod ttl;

pub use cancel::CancellationToken;
pub use coalesce::RequestCoalescer;
pub use error::{CacheError, CacheResult};
pub use stats::CacheStats;
pub use ttl::TtlCache;
