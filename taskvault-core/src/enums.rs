//! Enum types for taskvault entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Progress state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    /// Parse from database string representation.
    ///
    /// Matching is exact: only the literal enumeration values are accepted.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            _ => Err(EnumParseError::new("task_status", s)),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for TaskStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Recurrence schedule of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    #[default]
    Never,
}

impl RepeatKind {
    pub const ALL: [RepeatKind; 5] = [
        RepeatKind::Daily,
        RepeatKind::Weekly,
        RepeatKind::Monthly,
        RepeatKind::Yearly,
        RepeatKind::Never,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RepeatKind::Daily => "DAILY",
            RepeatKind::Weekly => "WEEKLY",
            RepeatKind::Monthly => "MONTHLY",
            RepeatKind::Yearly => "YEARLY",
            RepeatKind::Never => "NEVER",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "DAILY" => Ok(RepeatKind::Daily),
            "WEEKLY" => Ok(RepeatKind::Weekly),
            "MONTHLY" => Ok(RepeatKind::Monthly),
            "YEARLY" => Ok(RepeatKind::Yearly),
            "NEVER" => Ok(RepeatKind::Never),
            _ => Err(EnumParseError::new("repeat_task", s)),
        }
    }

    /// Whether the task recurs at all.
    pub fn is_recurring(&self) -> bool {
        !matches!(self, RepeatKind::Never)
    }
}

impl fmt::Display for RepeatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for RepeatKind {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing a string that is not a member of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub field: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.field, self.value)
    }
}

impl std::error::Error for EnumParseError {}
