//! Disabled cache: every read misses and every write is dropped.

use std::time::Duration;

use async_trait::async_trait;
use taskvault_core::CacheResult;

use super::EphemeralCache;

/// Cache provider used when caching is turned off or the configured backend
/// could not be reached at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl NoOpCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EphemeralCache for NoOpCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}
