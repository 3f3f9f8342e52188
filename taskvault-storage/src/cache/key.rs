//! Cache key construction for task snapshots.

use std::fmt;

use taskvault_core::TaskId;

/// Cache key for a single task.
///
/// The key is the canonical hyphenated id string. A non-empty namespace
/// prefix is joined with `:` so several deployments can share one cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskCacheKey(String);

impl TaskCacheKey {
    pub fn new(prefix: &str, id: TaskId) -> Self {
        if prefix.is_empty() {
            Self(id.to_string())
        } else {
            Self(format!("{prefix}:{id}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskCacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_key_without_prefix_is_bare_id() {
        let id = Uuid::now_v7();
        assert_eq!(TaskCacheKey::new("", id).as_str(), id.to_string());
    }

    #[test]
    fn test_key_with_prefix() {
        let id = Uuid::nil();
        let key = TaskCacheKey::new("tasks", id);
        assert_eq!(
            key.to_string(),
            "tasks:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_distinct_ids_give_distinct_keys() {
        assert_ne!(
            TaskCacheKey::new("t", Uuid::now_v7()),
            TaskCacheKey::new("t", Uuid::now_v7())
        );
    }
}
