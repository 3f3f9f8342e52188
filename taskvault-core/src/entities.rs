//! Core entity structures

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{new_task_id, RepeatKind, TaskId, TaskStatus, Timestamp, UserId};

/// Task - the single entity of record.
///
/// Owned by the durable store. Anything held by the cache is a snapshot of
/// this struct, never the authoritative copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Owning principal. Absent in single-tenant deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: Timestamp,
    pub repeat: RepeatKind,
    /// Lookup-only association; the referenced task may not exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<TaskId>,
}

impl Task {
    /// Construct a new task, assigning the id, creation time and defaults.
    pub fn create(new: NewTask) -> Self {
        Self::create_at(new, new_task_id(), Utc::now())
    }

    /// Construct a new task with an explicit id and creation time.
    pub fn create_at(new: NewTask, id: TaskId, created_at: Timestamp) -> Self {
        Self {
            id,
            user_id: new.user_id,
            title: new.title,
            description: new.description,
            status: TaskStatus::default(),
            created_at,
            repeat: new.repeat.unwrap_or_default(),
            parent_task_id: new.parent_task_id,
        }
    }
}

/// Caller-supplied fields for task creation.
///
/// Identity, status and creation time are never taken from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub repeat: Option<RepeatKind>,
    #[serde(default)]
    pub parent_task_id: Option<TaskId>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatKind) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_parent(mut self, parent_task_id: TaskId) -> Self {
        self.parent_task_id = Some(parent_task_id);
        self
    }
}

/// Sparse patch for a task.
///
/// A field is applied only when it is present and non-empty. `Some("")` is
/// treated exactly like `None`, so an empty value in a partial request body
/// never overwrites stored data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub repeat: Option<RepeatKind>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatKind) -> Self {
        self.repeat = Some(repeat);
        self
    }

    /// Title to apply, if any.
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    /// Description to apply, if any.
    pub fn description(&self) -> Option<&str> {
        non_empty(&self.description)
    }

    /// True if applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.title().is_none()
            && self.description().is_none()
            && self.status.is_none()
            && self.repeat.is_none()
    }

    /// Apply the effective fields of this patch to a task in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = self.title() {
            task.title = title.to_string();
        }
        if let Some(description) = self.description() {
            task.description = description.to_string();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(repeat) = self.repeat {
            task.repeat = repeat;
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
