//! Coalescing of concurrent identical lookups

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::domain::DomainError;

type SharedLookup<V> = Shared<BoxFuture<'static, Result<V, DomainError>>>;
type InFlightMap<V> = Arc<Mutex<HashMap<String, SharedLookup<V>>>>;

/// Tracks lookups that are still running, keyed by cache key
///
/// Callers asking for a key that is already in flight await the same
/// shared future instead of starting a second request. An entry is
/// removed as soon as its lookup settles, successful or not, so failures
/// are never replayed to later callers.
pub struct RequestCoalescer<V> {
    in_flight: InFlightMap<V>,
}

impl<V> RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs the lookup built by `start`, or joins the one already running
    /// for `key`
    pub async fn run<F, Fut>(&self, key: &str, start: F) -> Result<V, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        let lookup = {
            let mut in_flight = lock(&self.in_flight);

            match in_flight.get(key) {
                Some(existing) => {
                    tracing::debug!(key, "Joining in-flight lookup");
                    existing.clone()
                }
                None => {
                    let registry = Arc::clone(&self.in_flight);
                    let owned_key = key.to_string();
                    let lookup = start();

                    let shared = async move {
                        let result = lookup.await;
                        lock(&registry).remove(&owned_key);
                        result
                    }
                    .boxed()
                    .shared();

                    in_flight.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        lookup.await
    }

    /// Number of lookups currently running
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

impl<V> Default for RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for RequestCoalescer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_flight = lock(&self.in_flight).len();
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &in_flight)
            .finish()
    }
}

fn lock<V>(map: &Mutex<HashMap<String, V>>) -> MutexGuard<'_, HashMap<String, V>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_calls_share_one_lookup() {
        let coalescer = RequestCoalescer::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let start = || {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok("value".to_string())
            }
        };

        let (a, b) = tokio::join!(coalescer.run("k", start()), coalescer.run("k", start()));

        assert_eq!(a.unwrap(), "value");
        assert_eq!(b.unwrap(), "value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_run_separately() {
        let coalescer = RequestCoalescer::<u32>::new();

        let (a, b) = tokio::join!(
            coalescer.run("a", || async { Ok(1) }),
            coalescer.run("b", || async { Ok(2) })
        );

        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_retained() {
        let coalescer = RequestCoalescer::<u32>::new();

        let first = coalescer
            .run("k", || async { Err(DomainError::not_found("missing")) })
            .await;
        assert!(first.unwrap_err().is_not_found());
        assert_eq!(coalescer.in_flight(), 0);

        let second = coalescer.run("k", || async { Ok(7) }).await;
        assert_eq!(second.unwrap(), 7);
    }
}
