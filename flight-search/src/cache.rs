//! Caching layer for search results.
//!
//! A search's deduplicated, unfiltered itinerary set is memoised under a key
//! built from everything that shapes it: origin, destination, effective
//! departure, seats and hop bound. Filters, sort and pagination run after the
//! lookup, so requests that differ only in those share one entry.
//!
//! The cache is an optimisation. Every method degrades to "absent" or a no-op
//! rather than failing.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use moka::Expiry;
use moka::future::Cache as MokaCache;

use crate::domain::AirportCode;

/// Default key prefix, shared with other services reading the same store.
pub const DEFAULT_KEY_PREFIX: &str = "flight_search:";

/// Configuration for the result cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// Prefix for every key.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            max_capacity: 10_000,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

/// Cache key for a search: `{prefix}{origin}_{destination}_{departure}_{seats}_{max_hops}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(
        prefix: &str,
        origin: AirportCode,
        destination: AirportCode,
        departure: NaiveDateTime,
        seats: u32,
        max_hops: usize,
    ) -> Self {
        CacheKey(format!(
            "{prefix}{origin}_{destination}_{}_{seats}_{max_hops}",
            departure.format("%Y-%m-%dT%H:%M:%S")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key-value store for serialised search results.
///
/// Implementations never surface errors: a failing backend reads as a miss
/// and writes are dropped.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;

    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> impl Future<Output = ()> + Send;

    fn evict(&self, key: &str) -> impl Future<Output = ()> + Send;
}

/// Cached value with the TTL it was written with.
#[derive(Clone)]
struct Entry {
    bytes: Arc<Vec<u8>>,
    ttl: Duration,
}

/// Expire each entry after the TTL given to `put`.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process result cache.
pub struct MokaResultCache {
    entries: MokaCache<String, Entry>,
}

impl MokaResultCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { entries }
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn evict_all(&self) {
        self.entries.invalidate_all();
    }
}

impl ResultCache for MokaResultCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .get(key)
            .await
            .map(|entry| entry.bytes.as_ref().clone())
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let entry = Entry {
            bytes: Arc::new(value),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
    }

    async fn evict(&self, key: &str) {
        self.entries.invalidate(key).await;
    }
}
