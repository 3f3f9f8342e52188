//! Durable store contract and in-memory implementation.
//!
//! The durable store is the authority for task records. The cache-coordinated
//! service only ever reads its answers, it never second-guesses them.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use taskvault_core::{StoreError, StoreResult, Task, TaskId, TaskPatch};

/// Capability contract for authoritative task persistence.
///
/// Implementations must be safe for concurrent use by many in-flight
/// operations, and every call must be atomic on its own.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Persist a new task.
    ///
    /// Fails with `Conflict` if the id already exists.
    async fn create(&self, task: &Task) -> StoreResult<()>;

    /// Fetch a task by id, or `NotFound`.
    async fn get_by_id(&self, id: TaskId) -> StoreResult<Task>;

    /// Apply the effective fields of a sparse patch.
    ///
    /// Fails with `NotFound` when no row matches.
    async fn update_by_id(&self, id: TaskId, patch: &TaskPatch) -> StoreResult<()>;

    /// Remove a task. Returns whether a row existed.
    ///
    /// Deleting a missing task is a successful no-op.
    async fn delete_by_id(&self, id: TaskId) -> StoreResult<bool>;

    /// Check that the store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// In-memory store for development and testing.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<TaskId, Task>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.tasks.clear();
    }
}

#[async_trait]
impl DurableStore for InMemoryTaskStore {
    async fn create(&self, task: &Task) -> StoreResult<()> {
        match self.tasks.entry(task.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict { id: task.id }),
            Entry::Vacant(slot) => {
                slot.insert(task.clone());
                Ok(())
            }
        }
    }

    async fn get_by_id(&self, id: TaskId) -> StoreResult<Task> {
        self.tasks
            .get(&id)
            .map(|task| task.value().clone())
            .ok_or(StoreError::NotFound { id })
    }

    async fn update_by_id(&self, id: TaskId, patch: &TaskPatch) -> StoreResult<()> {
        let mut task = self
            .tasks
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        patch.apply_to(&mut *task);
        Ok(())
    }

    async fn delete_by_id(&self, id: TaskId) -> StoreResult<bool> {
        Ok(self.tasks.remove(&id).is_some())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskvault_core::{NewTask, RepeatKind, TaskStatus};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_create_then_get() {
        let store = InMemoryTaskStore::new();
        let task = Task::create(NewTask::new("Buy milk"));

        store.create(&task).await.unwrap();

        assert_eq!(store.get_by_id(task.id).await.unwrap(), task);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let store = InMemoryTaskStore::new();
        let task = Task::create(NewTask::new("Buy milk"));

        store.create(&task).await.unwrap();
        let err = store.create(&task).await.unwrap_err();

        assert_eq!(err, StoreError::Conflict { id: task.id });
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = InMemoryTaskStore::new();
        let id = Uuid::now_v7();
        assert_eq!(
            store.get_by_id(id).await.unwrap_err(),
            StoreError::NotFound { id }
        );
    }

    #[tokio::test]
    async fn test_update_applies_sparse_patch() {
        let store = InMemoryTaskStore::new();
        let task = Task::create(NewTask::new("Buy milk").with_description("2 litres"));
        store.create(&task).await.unwrap();

        let patch = TaskPatch::new()
            .with_title("")
            .with_status(TaskStatus::InProgress)
            .with_repeat(RepeatKind::Daily);
        store.update_by_id(task.id, &patch).await.unwrap();

        let stored = store.get_by_id(task.id).await.unwrap();
        assert_eq!(stored.title, "Buy milk");
        assert_eq!(stored.description, "2 litres");
        assert_eq!(stored.status, TaskStatus::InProgress);
        assert_eq!(stored.repeat, RepeatKind::Daily);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryTaskStore::new();
        let id = Uuid::now_v7();
        let err = store
            .update_by_id(id, &TaskPatch::new().with_title("x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryTaskStore::new();
        let task = Task::create(NewTask::new("Buy milk"));
        store.create(&task).await.unwrap();

        assert!(store.delete_by_id(task.id).await.unwrap());
        assert!(!store.delete_by_id(task.id).await.unwrap());
        assert!(store.is_empty());
    }
}
