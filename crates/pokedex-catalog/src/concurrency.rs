//! Bounded, order-preserving concurrent map
//!
//! `min(limit, len)` workers pull the next unclaimed index from a shared
//! counter until the input is exhausted. Results land in their input slot,
//! so output order never depends on completion order. Workers run on the
//! calling task; nothing is spawned.

use futures::future::try_join_all;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Apply `f` to every item with at most `limit` calls in flight.
///
/// The first error fails the whole call and abandons the remaining work.
/// A `limit` of zero is treated as one.
pub async fn map_concurrent<T, R, E, F, Fut>(items: &[T], limit: usize, f: F) -> Result<Vec<R>, E>
where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let workers = limit.max(1).min(items.len());
    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<R>>> = Mutex::new(items.iter().map(|_| None).collect());

    {
        let (next, slots, f) = (&next, &slots, &f);
        let worker = move || async move {
            loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(index) else {
                    return Ok::<(), E>(());
                };
                let value = f(item).await?;
                slots.lock()[index] = Some(value);
            }
        };

        try_join_all((0..workers).map(|_| worker())).await?;
    }

    Ok(slots.into_inner().into_iter().flatten().collect())
}
