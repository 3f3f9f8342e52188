//! Ephemeral cache layer.
//!
//! The cache holds time-bounded JSON snapshots of tasks keyed by id. It is
//! allowed to be empty, stale within its TTL, or entirely unreachable; the
//! durable store stays the source of truth.
//!
//! Providers in this crate:
//!
//! - [`InMemoryCache`]: moka cache with per-entry TTL and a capacity bound,
//!   for single-process deployments and tests
//! - [`NoOpCache`]: caching disabled
//!
//! The Redis provider lives with the other network adapters in the API crate.

pub mod key;
pub mod memory;
pub mod noop;
pub mod traits;

pub use key::TaskCacheKey;
pub use memory::{InMemoryCache, DEFAULT_MAX_ENTRIES};
pub use noop::NoOpCache;
pub use traits::{CacheStats, EphemeralCache, MAX_CACHE_TTL};
