//! services/api/src/adapters/cache.rs
//!
//! In-process implementation of the `CacheStore` port using moka.
//! Every entry carries its own time-to-live.

use async_trait::async_trait;
use campus_ai_core::{CacheStore, PortResult};
use moka::{future::Cache, Expiry};
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CachedValue {
    value: Value,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// A bounded, TTL-aware key-value cache shared by the whole process.
#[derive(Clone)]
pub struct MokaCacheAdapter {
    cache: Cache<String, CachedValue>,
}

impl MokaCacheAdapter {
    /// Creates a cache holding at most `max_entries` values.
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheStore for MokaCacheAdapter {
    async fn get(&self, key: &str) -> PortResult<Option<Value>> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> PortResult<()> {
        self.cache
            .insert(key.to_string(), CachedValue { value, ttl })
            .await;
        Ok(())
    }
}
