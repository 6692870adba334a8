//! Request coalescing
//!
//! [`RequestCoalescer`] guarantees at most one outstanding producer per key.
//! The first caller for a key spawns the producer on the tokio runtime and
//! registers a shared handle to its result; every caller arriving while that
//! handle is registered awaits the same result, success or failure.
//!
//! The producer task owns its registry slot. The slot is released when the
//! task settles (or unwinds), not when callers stop waiting, so a caller that
//! walks away never cancels work other callers or the cache still want.

use crate::cancel::CancellationToken;
use crate::error::CacheError;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;
type Registry<V, E> = Arc<Mutex<HashMap<String, SharedFetch<V, E>>>>;

/// Releases a registry slot when the producer task finishes or unwinds
struct SlotGuard<V, E> {
    registry: Registry<V, E>,
    key: String,
}

impl<V, E> Drop for SlotGuard<V, E> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

/// Deduplicates concurrent fetches by key
///
/// `V` and `E` must be `Clone` because every waiter receives its own copy of
/// the settled result. Must be used from within a tokio runtime.
pub struct RequestCoalescer<V, E> {
    in_flight: Registry<V, E>,
}

impl<V, E> RequestCoalescer<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<CacheError> + 'static,
{
    /// Create a coalescer with nothing in flight
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `producer` for `key` unless a run is already in flight, and await
    /// the shared result.
    pub async fn fetch_once<F, Fut>(&self, key: &str, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.join_or_start(key, producer).await
    }

    /// Like [`fetch_once`](Self::fetch_once), but the caller stops waiting
    /// when `token` is cancelled.
    ///
    /// Cancellation yields `CacheError::Cancelled` to this caller only. The
    /// shared producer keeps running for other waiters.
    pub async fn fetch_once_cancellable<F, Fut>(
        &self,
        key: &str,
        producer: F,
        token: &CancellationToken,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if token.is_cancelled() {
            return Err(CacheError::Cancelled(key.to_owned()).into());
        }

        let shared = self.join_or_start(key, producer);
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(key, "caller cancelled wait on in-flight fetch");
                Err(CacheError::Cancelled(key.to_owned()).into())
            }
            result = shared => result,
        }
    }

    /// Number of keys with a fetch in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Whether a fetch for `key` is currently running
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    fn join_or_start<F, Fut>(&self, key: &str, producer: F) -> SharedFetch<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let mut in_flight = self.in_flight.lock();
        if let Some(existing) = in_flight.get(key) {
            debug!(key, "joining in-flight fetch");
            return existing.clone();
        }

        // The slot is inserted below while the lock is still held, so the
        // guard's removal can never run before the insert.
        let guard = SlotGuard {
            registry: Arc::clone(&self.in_flight),
            key: key.to_owned(),
        };
        let work = producer();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            work.await
        });

        let task_key = key.to_owned();
        let shared = async move {
            handle.await.unwrap_or_else(|err| {
                Err(CacheError::TaskFailed {
                    key: task_key,
                    reason: err.to_string(),
                }
                .into())
            })
        }
        .boxed()
        .shared();

        in_flight.insert(key.to_owned(), shared.clone());
        debug!(key, "started fetch");
        shared
    }
}

impl<V, E> Default for RequestCoalescer<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<CacheError> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> Clone for RequestCoalescer<V, E> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<V, E> std::fmt::Debug for RequestCoalescer<V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}
