//! Task REST API Routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use taskvault_storage::TaskService;

use crate::config::TenancyConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{
    CreateTaskRequest, CreateTaskResponse, TaskIdResponse, UpdateTaskRequest, UpdateTaskResponse,
};
use crate::validation::{parse_task_id, validate_create, validate_update};

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /tasks - Create a new task
pub async fn create_task(
    State(service): State<TaskService>,
    State(tenancy): State<TenancyConfig>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let new = validate_create(body(payload)?, tenancy.multi_tenant)?;
    let task = service.create(new).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTaskResponse {
            task_id: task.id,
            task,
        }),
    ))
}

/// GET /tasks/{id} - Get a task by ID
pub async fn get_task(
    State(service): State<TaskService>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_task_id(&id)?;
    let task = service.get_by_id(id).await?;
    Ok(Json(task))
}

/// PATCH /tasks/{id} - Apply a sparse update
pub async fn update_task(
    State(service): State<TaskService>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_task_id(&id)?;
    let patch = validate_update(body(payload)?)?;

    let response = match service.update_by_id(id, &patch).await? {
        Some(task) => UpdateTaskResponse::Refreshed(task),
        None => UpdateTaskResponse::Committed(TaskIdResponse { id }),
    };
    Ok(Json(response))
}

/// DELETE /tasks/{id} - Delete a task
pub async fn delete_task(
    State(service): State<TaskService>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_task_id(&id)?;
    service.delete_by_id(id).await?;
    Ok(Json(TaskIdResponse { id }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the task routes router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(create_task))
        .route("/:id", get(get_task).patch(update_task).delete(delete_task))
        .with_state(state)
}
