//! Identity types for taskvault entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Task identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, so IDs sort by creation time.
pub type TaskId = Uuid;

/// Identifier of the principal that owns a task.
pub type UserId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 TaskId.
pub fn new_task_id() -> TaskId {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_id_is_v7() {
        let id = new_task_id();
        assert_eq!(id.get_version_num(), 7);
    }

    #[test]
    fn test_new_task_ids_sort_by_creation() {
        let first = new_task_id();
        let second = new_task_id();
        assert!(first < second);
    }
}
