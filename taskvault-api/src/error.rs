//! API error type and its HTTP mapping.
//!
//! Every failure leaving a handler is an [`ApiError`], rendered as a JSON body
//! `{ "code", "message", "details"? }` under the status its [`ErrorCode`]
//! maps to. Domain errors from `taskvault-core` convert by kind; transport
//! errors from the Postgres driver and pool are logged in full and surfaced
//! with a generic message.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use deadpool_postgres::PoolError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use taskvault_core::{ConfigError, StoreError, TaskError, ValidationError};

/// Machine-readable error category, serialized as `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Body could not be decoded as JSON of the expected shape.
    InvalidInput,
    MissingField,
    /// A field was present but not parseable (UUID, enum literal).
    InvalidFormat,
    /// Update carried no field to apply.
    EmptyPatch,
    TaskNotFound,
    TaskAlreadyExists,
    InternalError,
    DatabaseError,
    ServiceUnavailable,
    ConnectionPoolExhausted,
}

impl ErrorCode {
    pub fn status_code(self) -> StatusCode {
        use ErrorCode::*;
        match self {
            InvalidInput | MissingField | InvalidFormat | EmptyPatch => StatusCode::BAD_REQUEST,
            TaskNotFound => StatusCode::NOT_FOUND,
            TaskAlreadyExists => StatusCode::CONFLICT,
            ServiceUnavailable | ConnectionPoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            InternalError | DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error body returned by every failing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Extra context, currently the offending `field` for input errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn for_field(code: ErrorCode, field: &str, message: String) -> Self {
        Self::new(code, message).with_details(json!({ "field": field }))
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::for_field(
            ErrorCode::MissingField,
            field,
            format!("Required field '{}' is missing", field),
        )
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::for_field(
            ErrorCode::InvalidFormat,
            field,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    pub fn empty_patch(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::EmptyPatch, reason)
    }

    pub fn task_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::TaskNotFound, format!("Task {} not found", id))
    }

    pub fn task_already_exists(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::TaskAlreadyExists,
            format!("Task with id {} already exists", id),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::task_not_found(id),
            StoreError::Conflict { id } => Self::task_already_exists(id),
            StoreError::Unavailable { reason } => {
                // Transport details stay in the log.
                tracing::error!(reason = %reason, "Task store unavailable");
                Self::service_unavailable("Task store unavailable")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { field } => Self::missing_field(&field),
            ValidationError::InvalidValue { field, reason } => Self::for_field(
                ErrorCode::InvalidFormat,
                &field,
                format!("Invalid {}: {}", field, reason),
            ),
            ValidationError::InvalidPatch { reason } => Self::empty_patch(reason),
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Store(e) => e.into(),
            TaskError::Validation(e) => e.into(),
            TaskError::Config(e) => e.into(),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::internal_error(err.to_string())
    }
}

impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        Self::invalid_format("id", &format!("valid UUID: {}", err))
    }
}

impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!(error = ?err, "Database error");
        Self::database_error("Database operation failed")
    }
}

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        tracing::error!(error = ?err, "Connection pool error");
        match err {
            PoolError::Timeout(_) => Self::new(
                ErrorCode::ConnectionPoolExhausted,
                "Connection pool exhausted",
            ),
            PoolError::Closed => Self::service_unavailable("Database connection pool is closed"),
            _ => Self::database_error("Failed to acquire database connection"),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
