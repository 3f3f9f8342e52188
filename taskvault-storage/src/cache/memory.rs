//! In-process cache with per-entry TTL and a capacity bound.
//!
//! Backed by `moka::future::Cache`. Unlike a cache-wide `time_to_live`, each
//! entry carries the TTL it was written with, and an overwrite renews it.
//!
//! **Important**: this cache is NOT distributed. Every process holds its own
//! entries, so only use it for single-instance deployments and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::notification::RemovalCause;
use moka::Expiry;
use taskvault_core::{CacheError, CacheResult};
use tracing::debug;

use super::{CacheStats, EphemeralCache, MAX_CACHE_TTL};

/// Default capacity for [`InMemoryCache`].
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Expires every entry `ttl` after its latest write.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-memory cache provider using Moka.
#[derive(Clone)]
pub struct InMemoryCache {
    cache: moka::future::Cache<String, Entry>,
    max_entries: usize,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("max_entries", &self.max_entries)
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `max_entries` keys (minimum 1).
    pub fn with_capacity(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        let evictions = Arc::new(AtomicU64::new(0));

        let counter = evictions.clone();
        let cache = moka::future::Cache::builder()
            .max_capacity(max_entries as u64)
            .expire_after(PerEntryTtl)
            .eviction_listener(move |_key, _entry, cause| {
                if cause == RemovalCause::Size {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        debug!(max_entries, "in-memory cache created");

        Self {
            cache,
            max_entries,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            evictions,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Snapshot of usage counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.cache.entry_count(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Apply pending expirations and evictions so that [`stats`](Self::stats)
    /// is exact.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl EphemeralCache for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let value = self.cache.get(key).await.map(|entry| entry.value);
        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        if ttl > MAX_CACHE_TTL {
            return Err(CacheError::Backend(format!(
                "ttl {:?} exceeds the maximum of {:?}",
                ttl, MAX_CACHE_TTL
            )));
        }

        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryCache::new();
        cache.set("a", "1", TTL).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = InMemoryCache::new();
        cache.set("a", "1", TTL).await.unwrap();
        cache.set("a", "2", TTL).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("2"));

        cache.run_pending_tasks().await;
        assert_eq!(cache.stats().entry_count, 1);
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_ok() {
        let cache = InMemoryCache::new();
        cache.delete("missing").await.unwrap();
        cache.set("a", "1", TTL).await.unwrap();
        cache.delete("a").await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = InMemoryCache::new();
        cache.set("a", "1", Duration::from_millis(100)).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("1"));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(cache.get("a").await.unwrap(), None);

        cache.run_pending_tasks().await;
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_entries_keep_their_own_ttl() {
        let cache = InMemoryCache::new();
        cache.set("short", "1", Duration::from_millis(100)).await.unwrap();
        cache.set("long", "2", TTL).await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_overwrite_renews_ttl() {
        let ttl = Duration::from_millis(400);
        let cache = InMemoryCache::new();
        cache.set("a", "1", ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        cache.set("a", "2", ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_capacity_bound() {
        let cache = InMemoryCache::with_capacity(2);
        for key in ["a", "b", "c", "d"] {
            cache.set(key, "v", TTL).await.unwrap();
        }

        cache.run_pending_tasks().await;
        assert!(cache.stats().entry_count <= 2);
    }

    #[tokio::test]
    async fn test_ttl_above_maximum_is_rejected() {
        let cache = InMemoryCache::new();

        let err = cache
            .set("a", "1", Duration::from_secs(u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Backend(_)));
        assert_eq!(cache.get("a").await.unwrap(), None);

        cache.set("a", "1", MAX_CACHE_TTL).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let cache = InMemoryCache::new();
        cache.set("a", "1", TTL).await.unwrap();
        cache.get("a").await.unwrap();
        cache.get("b").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
