//! Ephemeral cache contract and usage statistics.

use std::time::Duration;

use async_trait::async_trait;
use taskvault_core::CacheResult;

/// Longest TTL a cache entry may be written with.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Cache backend trait for pluggable cache implementations.
///
/// Values are opaque strings (serialized task snapshots). Implementations may
/// report [`CacheError`](taskvault_core::CacheError) freely; callers that
/// must not fail on cache trouble are expected to absorb it.
///
/// # Expiry
///
/// Every entry is written with a TTL of at most [`MAX_CACHE_TTL`]. An expired
/// entry must read as absent, whether the backend evicts eagerly or lazily.
#[async_trait]
pub trait EphemeralCache: Send + Sync {
    /// Get a value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value with a time-to-live, overwriting any existing entry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Remove a value. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> CacheResult<()>;

    /// Short provider name for logs and health output.
    fn provider_name(&self) -> &'static str;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of entries currently held. Approximate until pending
    /// maintenance has run.
    pub entry_count: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_without_traffic() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
