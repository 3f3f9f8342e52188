//! Request Validation
//!
//! Turns raw request bodies into domain inputs. Everything the task service
//! receives has passed through here: ids are well-formed UUIDs, enum fields
//! hold exact enumeration literals, and updates carry at least one change.

use taskvault_core::{
    EnumParseError, NewTask, RepeatKind, TaskId, TaskPatch, TaskStatus, ValidationError,
};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::types::{CreateTaskRequest, UpdateTaskRequest};

/// Trait for validating non-empty strings.
pub trait ValidateNonEmpty {
    /// Fails with `RequiredFieldMissing` if the value is empty or
    /// whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        if self.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: field_name.to_string(),
            });
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        self.as_str().validate_non_empty(field_name)
    }
}

impl<T: ValidateNonEmpty> ValidateNonEmpty for Option<T> {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        match self {
            Some(value) => value.validate_non_empty(field_name),
            None => Err(ValidationError::RequiredFieldMissing {
                field: field_name.to_string(),
            }),
        }
    }
}

/// Trait for checking if an update request has any fields set.
pub trait HasUpdates {
    /// Check if any update fields carry a non-empty value.
    fn has_any_updates(&self) -> bool;

    /// Validate that at least one update field is set.
    fn validate_has_updates(&self) -> Result<(), ValidationError> {
        if !self.has_any_updates() {
            return Err(ValidationError::InvalidPatch {
                reason: "no fields to update".to_string(),
            });
        }
        Ok(())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl HasUpdates for UpdateTaskRequest {
    fn has_any_updates(&self) -> bool {
        present(&self.title).is_some()
            || present(&self.description).is_some()
            || present(&self.task_status).is_some()
            || present(&self.repeat_task).is_some()
    }
}

fn enum_error(err: EnumParseError, expected: &[&str]) -> ValidationError {
    ValidationError::InvalidValue {
        field: err.field.to_string(),
        reason: format!("'{}' is not one of {}", err.value, expected.join(", ")),
    }
}

/// Parse a path id.
pub fn parse_task_id(raw: &str) -> ApiResult<TaskId> {
    Uuid::parse_str(raw).map_err(ApiError::from)
}

/// Parse an optional UUID field; absent or empty is `None`.
pub fn parse_optional_uuid(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<Uuid>, ValidationError> {
    match raw.filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|e| ValidationError::InvalidValue {
                field: field.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Parse an optional status literal; absent or empty is `None`.
pub fn parse_status(raw: Option<&str>) -> Result<Option<TaskStatus>, ValidationError> {
    match raw.filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => TaskStatus::from_db_str(value).map(Some).map_err(|e| {
            let expected: Vec<&str> = TaskStatus::ALL.iter().map(TaskStatus::as_db_str).collect();
            enum_error(e, &expected)
        }),
    }
}

/// Parse an optional repeat literal; absent or empty is `None`.
pub fn parse_repeat(raw: Option<&str>) -> Result<Option<RepeatKind>, ValidationError> {
    match raw.filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => RepeatKind::from_db_str(value).map(Some).map_err(|e| {
            let expected: Vec<&str> = RepeatKind::ALL.iter().map(RepeatKind::as_db_str).collect();
            enum_error(e, &expected)
        }),
    }
}

/// Validate a create request.
///
/// In multi-tenant mode the owning user is required.
pub fn validate_create(
    req: CreateTaskRequest,
    multi_tenant: bool,
) -> Result<NewTask, ValidationError> {
    if multi_tenant {
        req.user_id.validate_non_empty("user_id")?;
    }

    Ok(NewTask {
        user_id: parse_optional_uuid("user_id", req.user_id.as_deref())?,
        title: req.title,
        description: req.description,
        repeat: parse_repeat(Some(req.repeat_task.as_str()))?,
        parent_task_id: parse_optional_uuid("parent_task_id", req.parent_task_id.as_deref())?,
    })
}

/// Validate an update request into a sparse patch.
pub fn validate_update(req: UpdateTaskRequest) -> Result<TaskPatch, ValidationError> {
    req.validate_has_updates()?;

    Ok(TaskPatch {
        status: parse_status(req.task_status.as_deref())?,
        repeat: parse_repeat(req.repeat_task.as_deref())?,
        title: req.title,
        description: req.description,
    })
}
