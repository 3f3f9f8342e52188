//! Taskvault Storage - Store/Cache Contracts and the Task Service
//!
//! Defines the durable store and ephemeral cache abstractions, their
//! in-process implementations, and [`TaskService`], which keeps the two
//! consistent for every task operation. Network-backed implementations
//! (PostgreSQL, Redis) live in taskvault-api.

pub mod cache;
pub mod service;
pub mod store;

pub use cache::{
    CacheStats, EphemeralCache, InMemoryCache, NoOpCache, TaskCacheKey, DEFAULT_MAX_ENTRIES,
    MAX_CACHE_TTL,
};
pub use service::{CacheSettings, TaskService, DEFAULT_CACHE_OP_TIMEOUT, DEFAULT_CACHE_TTL};
pub use store::{DurableStore, InMemoryTaskStore};
