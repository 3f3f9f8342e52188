//! Taskvault Test Utilities
//!
//! Centralized test infrastructure for the taskvault workspace:
//! - Proptest generators for tasks, patches and enums
//! - Test doubles for the store and cache contracts
//! - Test fixtures for common scenarios
//! - Custom assertions for task results

pub use taskvault_core::{
    CacheError, CacheResult, NewTask, RepeatKind, StoreError, StoreResult, Task, TaskError,
    TaskId, TaskPatch, TaskResult, TaskStatus, Timestamp, UserId,
};
pub use taskvault_storage::{
    CacheSettings, DurableStore, EphemeralCache, InMemoryCache, InMemoryTaskStore, NoOpCache,
    TaskService,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// Per-operation call counts recorded by [`CountingStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCallCounts {
    pub create: usize,
    pub get: usize,
    pub update: usize,
    pub delete: usize,
}

impl StoreCallCounts {
    pub fn total(&self) -> usize {
        self.create + self.get + self.update + self.delete
    }
}

/// Store wrapper that counts every call before delegating.
#[derive(Debug, Default)]
pub struct CountingStore<S> {
    inner: S,
    create: AtomicUsize,
    get: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
}

impl<S: DurableStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            create: AtomicUsize::new(0),
            get: AtomicUsize::new(0),
            update: AtomicUsize::new(0),
            delete: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn counts(&self) -> StoreCallCounts {
        StoreCallCounts {
            create: self.create.load(Ordering::SeqCst),
            get: self.get.load(Ordering::SeqCst),
            update: self.update.load(Ordering::SeqCst),
            delete: self.delete.load(Ordering::SeqCst),
        }
    }

    pub fn reset(&self) {
        self.create.store(0, Ordering::SeqCst);
        self.get.store(0, Ordering::SeqCst);
        self.update.store(0, Ordering::SeqCst);
        self.delete.store(0, Ordering::SeqCst);
    }
}

impl CountingStore<InMemoryTaskStore> {
    /// Counting wrapper around a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(InMemoryTaskStore::new())
    }
}

#[async_trait]
impl<S: DurableStore> DurableStore for CountingStore<S> {
    async fn create(&self, task: &Task) -> StoreResult<()> {
        self.create.fetch_add(1, Ordering::SeqCst);
        self.inner.create(task).await
    }

    async fn get_by_id(&self, id: TaskId) -> StoreResult<Task> {
        self.get.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }

    async fn update_by_id(&self, id: TaskId, patch: &TaskPatch) -> StoreResult<()> {
        self.update.fetch_add(1, Ordering::SeqCst);
        self.inner.update_by_id(id, patch).await
    }

    async fn delete_by_id(&self, id: TaskId) -> StoreResult<bool> {
        self.delete.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_id(id).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

/// Cache that fails every call with a connection error.
#[derive(Debug, Default)]
pub struct FailingCache {
    calls: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made against this cache.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, op: &str) -> CacheResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Connection(format!("{op}: connection refused")))
    }
}

#[async_trait]
impl EphemeralCache for FailingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        self.fail("get")
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        self.fail("set")
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        self.fail("delete")
    }

    async fn ping(&self) -> CacheResult<()> {
        self.fail("ping")
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating taskvault types.

    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a timestamp between 2020 and 2030, second precision.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1_577_836_800i64..1_893_456_000i64)
            .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }

    pub fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
        prop::sample::select(TaskStatus::ALL.to_vec())
    }

    pub fn arb_repeat_kind() -> impl Strategy<Value = RepeatKind> {
        prop::sample::select(RepeatKind::ALL.to_vec())
    }

    /// Non-empty title text.
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9][a-zA-Z0-9 ]{0,39}"
    }

    /// Description text, possibly empty.
    pub fn arb_description() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 .,]{0,80}"
    }

    /// Optional patch text where `Some("")` is as likely as a real value.
    fn arb_patch_text() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            "[a-zA-Z0-9 ]{1,40}".prop_map(Some),
        ]
    }

    /// Generate creation input.
    pub fn arb_new_task() -> impl Strategy<Value = NewTask> {
        (
            arb_title(),
            arb_description(),
            prop::option::of(arb_repeat_kind()),
            prop::option::of(arb_uuid()),
            prop::option::of(arb_uuid()),
        )
            .prop_map(|(title, description, repeat, user_id, parent_task_id)| NewTask {
                user_id,
                title,
                description,
                repeat,
                parent_task_id,
            })
    }

    /// Generate a sparse patch, including empty-string fields.
    pub fn arb_task_patch() -> impl Strategy<Value = TaskPatch> {
        (
            arb_patch_text(),
            arb_patch_text(),
            prop::option::of(arb_task_status()),
            prop::option::of(arb_repeat_kind()),
        )
            .prop_map(|(title, description, status, repeat)| TaskPatch {
                title,
                description,
                status,
                repeat,
            })
    }

    /// Generate a fully populated task.
    pub fn arb_task() -> impl Strategy<Value = Task> {
        (
            arb_uuid(),
            arb_new_task(),
            arb_task_status(),
            arb_timestamp(),
        )
            .prop_map(|(id, new, status, created_at)| {
                let mut task = Task::create_at(new, id, created_at);
                task.status = status;
                task
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// The canonical "Buy milk" creation request with an empty repeat.
    pub fn buy_milk() -> NewTask {
        NewTask::new("Buy milk")
    }

    /// A persisted-shaped task owned by `user_id`.
    pub fn owned_task(user_id: UserId) -> Task {
        Task::create(
            NewTask::new("Water plants")
                .with_description("balcony and kitchen")
                .with_repeat(RepeatKind::Weekly)
                .with_user(user_id),
        )
    }

    /// In-memory store and cache wired into a service, with both handles
    /// returned for inspection.
    pub fn in_memory_service() -> (TaskService, Arc<InMemoryTaskStore>, Arc<InMemoryCache>) {
        let store = Arc::new(InMemoryTaskStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let service = TaskService::new(store.clone(), cache.clone(), CacheSettings::default());
        (service, store, cache)
    }

    /// Service over a counting in-memory store and an in-memory cache.
    pub fn counting_service() -> (TaskService, Arc<CountingStore<InMemoryTaskStore>>) {
        let store = Arc::new(CountingStore::in_memory());
        let service = TaskService::new(
            store.clone(),
            Arc::new(InMemoryCache::new()),
            CacheSettings::default(),
        );
        (service, store)
    }

    /// Service whose cache fails every call.
    pub fn failing_cache_service() -> (TaskService, Arc<FailingCache>) {
        let cache = Arc::new(FailingCache::new());
        let service = TaskService::new(
            Arc::new(InMemoryTaskStore::new()),
            cache.clone(),
            CacheSettings::default(),
        );
        (service, cache)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for task results.

    use super::*;

    /// Assert that a result is a store `NotFound`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &TaskResult<T>) {
        match result {
            Err(TaskError::Store(StoreError::NotFound { .. })) => {}
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    /// Assert that two tasks agree on every field except the ones a patch
    /// is allowed to change.
    #[track_caller]
    pub fn assert_same_identity(a: &Task, b: &Task) {
        assert_eq!(a.id, b.id, "id changed");
        assert_eq!(a.created_at, b.created_at, "created_at changed");
        assert_eq!(a.user_id, b.user_id, "user_id changed");
        assert_eq!(a.parent_task_id, b.parent_task_id, "parent_task_id changed");
    }
}
