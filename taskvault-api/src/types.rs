//! Request and response bodies for the task routes.
//!
//! Request fields are kept as raw strings so that empty values can be told
//! apart from malformed ones during validation.

use serde::{Deserialize, Serialize};
use taskvault_core::{Task, TaskId};

/// POST /tasks body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// One of DAILY, WEEKLY, MONTHLY, YEARLY, NEVER; empty means NEVER.
    #[serde(default)]
    pub repeat_task: String,
    /// Owning user. Required in multi-tenant deployments.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
}

/// PATCH /tasks/{id} body. Absent and empty fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// One of TODO, IN_PROGRESS, DONE.
    #[serde(default)]
    pub task_status: Option<String>,
    /// One of DAILY, WEEKLY, MONTHLY, YEARLY, NEVER.
    #[serde(default)]
    pub repeat_task: Option<String>,
}

/// POST /tasks response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub task_id: TaskId,
    pub task: Task,
}

/// Bare id acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIdResponse {
    pub id: TaskId,
}

/// PATCH /tasks/{id} response.
///
/// The refreshed task when it could be read back, otherwise only the id of
/// the task whose update was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateTaskResponse {
    Refreshed(Task),
    Committed(TaskIdResponse),
}
