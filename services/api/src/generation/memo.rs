//! services/api/src/generation/memo.rs
//!
//! Cache-keyed memoization over the `CacheStore` port.
//!
//! With single-flight enabled, concurrent misses for one key queue on a
//! per-key async lock and re-check the cache once they hold it, so the
//! producer runs once per key per TTL window. Disabled, every concurrent
//! miss runs its own producer and the last write wins.

use campus_ai_core::{CacheStore, GenerationError};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

type KeyLock = Arc<tokio::sync::Mutex<()>>;

pub struct Memoizer {
    store: Arc<dyn CacheStore>,
    single_flight: bool,
    in_flight: Mutex<HashMap<String, KeyLock>>,
}

impl Memoizer {
    pub fn new(store: Arc<dyn CacheStore>, single_flight: bool) -> Self {
        Self {
            store,
            single_flight,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, or runs `producer`, caches its
    /// result for `ttl` and returns it. Errors from `producer` are returned
    /// as-is and nothing is cached.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, GenerationError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        if let Some(hit) = self.lookup(key).await {
            return Ok(hit);
        }
        if !self.single_flight {
            return self.compute_and_store(key, ttl, producer).await;
        }

        let entry = InFlight::join(self, key);
        let _guard = entry.lock.lock().await;
        // A caller that held the lock before us may have filled the cache.
        match self.lookup(key).await {
            Some(hit) => Ok(hit),
            None => self.compute_and_store(key, ttl, producer).await,
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = match self.store.get(key).await {
            Ok(cached) => cached?,
            Err(e) => {
                warn!(cache_key = key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_value(cached) {
            Ok(value) => {
                debug!(cache_key = key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(cache_key = key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn compute_and_store<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, GenerationError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        debug!(cache_key = key, "Cache miss");
        let value = producer().await?;
        match serde_json::to_value(&value) {
            Ok(json) => {
                if let Err(e) = self.store.put(key, json, ttl).await {
                    warn!(cache_key = key, error = %e, "Cache write failed");
                }
            }
            Err(e) => warn!(cache_key = key, error = %e, "Result is not serializable, not cached"),
        }
        Ok(value)
    }

    fn key_lock(&self, key: &str) -> KeyLock {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        in_flight.entry(key.to_string()).or_default().clone()
    }

    /// Drops the per-key lock once no other caller is holding or waiting on it.
    fn release(&self, key: &str, lock: &KeyLock) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        // One reference in the map, one held by the releasing caller.
        if Arc::strong_count(lock) <= 2 {
            in_flight.remove(key);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

/// A caller's membership of a key's queue. Released on drop, so a caller
/// whose future is cancelled mid-generation does not leak its map entry.
struct InFlight<'a> {
    memo: &'a Memoizer,
    key: &'a str,
    lock: KeyLock,
}

impl<'a> InFlight<'a> {
    fn join(memo: &'a Memoizer, key: &'a str) -> Self {
        Self {
            memo,
            key,
            lock: memo.key_lock(key),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.memo.release(self.key, &self.lock);
    }
}
