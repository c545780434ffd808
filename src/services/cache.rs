// Fingerprint Cache
// Memoizes model perplexity per normalized text, one computation per fingerprint

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Hex SHA-256 of the text.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[derive(Default)]
struct CacheState {
    cells: HashMap<String, Arc<OnceCell<f64>>>,
    // Insertion order for eviction
    order: VecDeque<String>,
}

pub struct FingerprintCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl FingerprintCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.cells.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached value for `key`, if a computation has completed.
    pub fn get(&self, key: &str) -> Option<f64> {
        let state = self.state.lock().ok()?;
        state.cells.get(key).and_then(|cell| cell.get().copied())
    }

    fn cell_for(&self, key: &str) -> Arc<OnceCell<f64>> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(cell) = state.cells.get(key) {
            return Arc::clone(cell);
        }

        let cell = Arc::new(OnceCell::new());
        state.cells.insert(key.to_string(), Arc::clone(&cell));
        state.order.push_back(key.to_string());

        // Evict the oldest settled entries; cells still computing stay put so
        // their waiters keep sharing one model call. Capacity may be exceeded
        // while every older cell is in flight.
        while state.cells.len() > self.capacity {
            let settled = state.order.iter().position(|k| {
                state
                    .cells
                    .get(k)
                    .map_or(true, |cell| cell.initialized())
            });
            match settled.and_then(|idx| state.order.remove(idx)) {
                Some(oldest) => {
                    state.cells.remove(&oldest);
                }
                None => break,
            }
        }

        cell
    }

    /// Return the cached value or run `compute`. Concurrent callers with the
    /// same key wait on a single computation; an error is returned to the
    /// caller that ran it and the next caller computes again.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<f64, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<f64, E>>,
    {
        let cell = self.cell_for(key);
        cell.get_or_try_init(compute).await.copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_fingerprint_is_stable_sha256() {
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let cache = Arc::new(FingerprintCache::new(16));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("same", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<f64, String>(37.5)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 37.5);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = FingerprintCache::new(4);
        let first: Result<f64, String> = cache
            .get_or_compute("k", || async { Err("down".to_string()) })
            .await;
        assert!(first.is_err());
        assert_eq!(cache.get("k"), None);

        let second: Result<f64, String> = cache.get_or_compute("k", || async { Ok(12.0) }).await;
        assert_eq!(second.unwrap(), 12.0);
        assert_eq!(cache.get("k"), Some(12.0));
    }

    #[tokio::test]
    async fn test_oldest_entry_is_evicted_at_capacity() {
        let cache = FingerprintCache::new(2);
        for (key, value) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            let _: Result<f64, ()> = cache.get_or_compute(key, || async move { Ok(value) }).await;
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("c"), Some(3.0));
    }

    #[tokio::test]
    async fn test_in_flight_entry_survives_eviction() {
        let cache = Arc::new(FingerprintCache::new(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow = {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_compute("slow", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let _ = release_rx.await;
                        Ok::<f64, String>(41.0)
                    })
                    .await
            })
        };
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        // Pushes the cache over capacity while "slow" is still computing
        let fast: Result<f64, String> = cache.get_or_compute("fast", || async { Ok(2.0) }).await;
        assert_eq!(fast.unwrap(), 2.0);

        let waiter = {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_compute("slow", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<f64, String>(-1.0)
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        let _ = release_tx.send(());

        assert_eq!(slow.await.unwrap().unwrap(), 41.0);
        assert_eq!(waiter.await.unwrap().unwrap(), 41.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
