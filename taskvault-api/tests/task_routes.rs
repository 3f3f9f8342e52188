//! Router-level tests against in-memory backends.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use taskvault_api::{
    build_app, create_api_router, AppConfig, AppState, CacheBackendKind, StoreBackendKind,
    TenancyConfig,
};
use taskvault_core::{Task, TaskStatus};
use taskvault_test_utils::fixtures;
use tower::ServiceExt;
use uuid::Uuid;

fn memory_config(multi_tenant: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.store.backend = StoreBackendKind::Memory;
    config.cache.backend = CacheBackendKind::Memory;
    config.tenancy.multi_tenant = multi_tenant;
    config
}

async fn app(multi_tenant: bool) -> Result<Router, String> {
    build_app(&memory_config(multi_tenant))
        .await
        .map_err(|e| e.to_string())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value), String> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .map_err(|e| e.to_string())?;

    let response = app
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| e.to_string())?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| e.to_string())?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    Ok((status, value))
}

async fn create(app: &Router, body: Value) -> Result<Task, String> {
    let (status, value) = send(app, "POST", "/tasks", Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED, "body: {value}");
    serde_json::from_value(value["task"].clone()).map_err(|e| e.to_string())
}

#[tokio::test]
async fn test_create_then_get() -> Result<(), String> {
    let app = app(false).await?;

    let (status, value) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({ "title": "Buy milk", "description": "2 liters" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(value["task_id"], value["task"]["id"]);
    assert_eq!(value["task"]["status"], "TODO");
    assert_eq!(value["task"]["repeat"], "NEVER");

    let id = value["task_id"].as_str().ok_or("missing task_id")?;
    let (status, fetched) = send(&app, "GET", &format!("/tasks/{id}"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, value["task"]);
    Ok(())
}

#[tokio::test]
async fn test_create_with_repeat_and_parent() -> Result<(), String> {
    let app = app(false).await?;
    let parent = Uuid::now_v7();

    let task = create(
        &app,
        json!({
            "title": "Water plants",
            "repeat_task": "WEEKLY",
            "parent_task_id": parent.to_string(),
        }),
    )
    .await?;
    assert_eq!(task.parent_task_id, Some(parent));
    assert!(task.repeat.is_recurring());
    Ok(())
}

#[tokio::test]
async fn test_patch_returns_refreshed_task() -> Result<(), String> {
    let app = app(false).await?;
    let task = create(&app, json!({ "title": "Buy milk" })).await?;

    let (status, value) = send(
        &app,
        "PATCH",
        &format!("/tasks/{}", task.id),
        Some(json!({ "task_status": "DONE", "title": "" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let updated: Task = serde_json::from_value(value).map_err(|e| e.to_string())?;
    assert_eq!(updated.id, task.id);
    assert_eq!(updated.status, TaskStatus::Done);
    assert_eq!(updated.title, "Buy milk");
    assert_eq!(updated.created_at, task.created_at);

    let (_, fetched) = send(&app, "GET", &format!("/tasks/{}", task.id), None).await?;
    assert_eq!(fetched["status"], "DONE");
    Ok(())
}

#[tokio::test]
async fn test_patch_without_changes_is_rejected() -> Result<(), String> {
    let app = app(false).await?;
    let task = create(&app, json!({ "title": "Buy milk" })).await?;

    let (status, value) = send(
        &app,
        "PATCH",
        &format!("/tasks/{}", task.id),
        Some(json!({ "title": "", "description": "" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "EMPTY_PATCH");
    Ok(())
}

#[tokio::test]
async fn test_patch_missing_task_is_not_found() -> Result<(), String> {
    let app = app(false).await?;

    let (status, value) = send(
        &app,
        "PATCH",
        &format!("/tasks/{}", Uuid::now_v7()),
        Some(json!({ "title": "Nope" })),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["code"], "TASK_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_delete_is_idempotent() -> Result<(), String> {
    let app = app(false).await?;
    let task = create(&app, json!({ "title": "Buy milk" })).await?;
    let uri = format!("/tasks/{}", task.id);

    let (status, value) = send(&app, "DELETE", &uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({ "id": task.id }));

    let (status, value) = send(&app, "GET", &uri, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["code"], "TASK_NOT_FOUND");

    let (status, _) = send(&app, "DELETE", &uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() -> Result<(), String> {
    let app = app(false).await?;

    let (status, value) = send(&app, "GET", "/tasks/not-a-uuid", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "INVALID_FORMAT");
    Ok(())
}

#[tokio::test]
async fn test_unknown_enum_literal_is_bad_request() -> Result<(), String> {
    let app = app(false).await?;

    let (status, value) = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({ "title": "Buy milk", "repeat_task": "HOURLY" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["details"]["field"], "repeat_task");

    let task = create(&app, json!({ "title": "Buy milk" })).await?;
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/tasks/{}", task.id),
        Some(json!({ "task_status": "done" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() -> Result<(), String> {
    let app = app(false).await?;

    let request = Request::builder()
        .method("POST")
        .uri("/tasks")
        .header("content-type", "application/json")
        .body(Body::from("{\"title\":"))
        .map_err(|e| e.to_string())?;
    let response = app.oneshot(request).await.map_err(|e| e.to_string())?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_multi_tenant_requires_user() -> Result<(), String> {
    let app = app(true).await?;

    let (status, value) = send(&app, "POST", "/tasks", Some(json!({ "title": "Buy milk" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "MISSING_FIELD");
    assert_eq!(value["details"]["field"], "user_id");

    let user = Uuid::now_v7();
    let task = create(
        &app,
        json!({ "title": "Buy milk", "user_id": user.to_string() }),
    )
    .await?;
    assert_eq!(task.user_id, Some(user));
    Ok(())
}

#[tokio::test]
async fn test_health_endpoints() -> Result<(), String> {
    let app = app(false).await?;

    let (status, value) = send(&app, "GET", "/health/ping", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, Value::String("pong".to_string()));

    let (status, value) = send(&app, "GET", "/health/live", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "healthy");

    let (status, value) = send(&app, "GET", "/health/ready", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "healthy");
    assert_eq!(value["details"]["store"]["backend"], "memory");
    assert_eq!(value["details"]["cache"]["backend"], "memory");
    Ok(())
}

#[tokio::test]
async fn test_failing_cache_degrades_but_serves() -> Result<(), String> {
    let (service, cache) = fixtures::failing_cache_service();
    let app = create_api_router(
        AppState::new(service, TenancyConfig::default()),
        &AppConfig::default().http,
    );

    let (status, value) = send(&app, "GET", "/health/ready", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "degraded");
    assert_eq!(value["details"]["cache"]["status"], "degraded");

    let task = create(&app, json!({ "title": "Buy milk" })).await?;
    let (status, fetched) = send(&app, "GET", &format!("/tasks/{}", task.id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Buy milk");
    assert!(cache.calls() > 0);
    Ok(())
}
