//! Cache-coordinated task service.
//!
//! Orchestrates the durable store and the ephemeral cache for every task
//! operation: read-through on get, write-through on create and update,
//! invalidation on delete.
//!
//! # Failure model
//!
//! Store errors are returned to the caller unchanged in kind. Cache errors
//! never are: a failed or timed-out cache read degrades to a miss, and a
//! failed cache write or delete is logged and ignored. Negative lookups are
//! never cached.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use taskvault_core::{CacheError, CacheResult, NewTask, Task, TaskId, TaskPatch, TaskResult};
use tracing::{debug, info, warn};

use crate::cache::{EphemeralCache, NoOpCache, TaskCacheKey};
use crate::store::DurableStore;

/// Default lifetime of a cached task snapshot.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default upper bound on a single cache round trip.
pub const DEFAULT_CACHE_OP_TIMEOUT: Duration = Duration::from_millis(250);

/// Cache behaviour of a [`TaskService`].
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// TTL written with every cache entry.
    pub ttl: Duration,
    /// Maximum time a cache call may take before it counts as failed.
    pub op_timeout: Duration,
    /// Namespace prepended to every key; empty for none.
    pub key_prefix: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            op_timeout: DEFAULT_CACHE_OP_TIMEOUT,
            key_prefix: String::new(),
        }
    }
}

impl CacheSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the per-call cache timeout.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Set the key namespace.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

/// The task service.
///
/// Cheap to clone; all clones share the same store and cache handles.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn DurableStore>,
    cache: Arc<dyn EphemeralCache>,
    settings: CacheSettings,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("store", &self.store.backend_name())
            .field("cache", &self.cache.provider_name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl TaskService {
    pub fn new(
        store: Arc<dyn DurableStore>,
        cache: Arc<dyn EphemeralCache>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    /// A service that talks to the store only.
    pub fn without_cache(store: Arc<dyn DurableStore>) -> Self {
        Self::new(store, Arc::new(NoOpCache), CacheSettings::default())
    }

    pub fn store(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<dyn EphemeralCache> {
        &self.cache
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Create and persist a new task, then populate the cache.
    ///
    /// A store failure is returned without touching the cache.
    pub async fn create(&self, new: NewTask) -> TaskResult<Task> {
        let task = Task::create(new);
        self.store.create(&task).await?;
        info!(task_id = %task.id, "task created");

        self.cache_store(&task).await;
        Ok(task)
    }

    /// Read-through lookup.
    ///
    /// A cache hit never reaches the store. A miss, a cache error, or an
    /// undecodable entry falls back to the store and repopulates the cache.
    pub async fn get_by_id(&self, id: TaskId) -> TaskResult<Task> {
        if let Some(task) = self.cache_lookup(id).await {
            return Ok(task);
        }

        let task = self.store.get_by_id(id).await?;
        self.cache_store(&task).await;
        Ok(task)
    }

    /// Apply a sparse patch, then refresh the cache from the store.
    ///
    /// Returns `None` when the update committed but the follow-up read
    /// failed; the cache is left alone in that case and expires on its own.
    pub async fn update_by_id(&self, id: TaskId, patch: &TaskPatch) -> TaskResult<Option<Task>> {
        self.store.update_by_id(id, patch).await?;
        info!(task_id = %id, "task updated");

        match self.store.get_by_id(id).await {
            Ok(task) => {
                self.cache_store(&task).await;
                Ok(Some(task))
            }
            Err(e) => {
                warn!(task_id = %id, error = %e, "re-read after update failed, cache not refreshed");
                Ok(None)
            }
        }
    }

    /// Delete a task and evict its cache entry.
    ///
    /// Deleting a missing task succeeds. The cache entry is evicted either
    /// way.
    pub async fn delete_by_id(&self, id: TaskId) -> TaskResult<()> {
        let existed = self.store.delete_by_id(id).await?;
        if existed {
            info!(task_id = %id, "task deleted");
        } else {
            debug!(task_id = %id, "delete of missing task");
        }

        self.cache_evict(id).await;
        Ok(())
    }

    fn key(&self, id: TaskId) -> TaskCacheKey {
        TaskCacheKey::new(&self.settings.key_prefix, id)
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = CacheResult<T>>,
    ) -> CacheResult<T> {
        match tokio::time::timeout(self.settings.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(format!(
                "{op} exceeded {:?}",
                self.settings.op_timeout
            ))),
        }
    }

    async fn cache_lookup(&self, id: TaskId) -> Option<Task> {
        let key = self.key(id);
        let raw = match self.bounded("get", self.cache.get(key.as_str())).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(task_id = %id, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(task_id = %id, op = "get", error = %e, "cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_str::<Task>(&raw) {
            Ok(task) if task.id == id => {
                debug!(task_id = %id, "cache hit");
                Some(task)
            }
            Ok(task) => {
                warn!(task_id = %id, cached_id = %task.id, "cache entry holds a different task, ignoring");
                None
            }
            Err(e) => {
                let err = CacheError::Serialization(e.to_string());
                warn!(task_id = %id, op = "decode", error = %err, "undecodable cache entry, ignoring");
                None
            }
        }
    }

    async fn cache_store(&self, task: &Task) {
        let raw = match serde_json::to_string(task) {
            Ok(raw) => raw,
            Err(e) => {
                let err = CacheError::Serialization(e.to_string());
                warn!(task_id = %task.id, op = "encode", error = %err, "cannot encode task for cache");
                return;
            }
        };

        let key = self.key(task.id);
        if let Err(e) = self
            .bounded("set", self.cache.set(key.as_str(), &raw, self.settings.ttl))
            .await
        {
            warn!(task_id = %task.id, op = "set", error = %e, "cache write failed");
        }
    }

    async fn cache_evict(&self, id: TaskId) {
        let key = self.key(id);
        if let Err(e) = self.bounded("delete", self.cache.delete(key.as_str())).await {
            warn!(task_id = %id, op = "delete", error = %e, "cache delete failed");
        }
    }
}
