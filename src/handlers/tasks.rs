// src/handlers/tasks.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::team::{CreateTaskPayload, Task, TaskFilter, UpdateTaskPayload},
};

// POST /api/tasks
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    request_body = CreateTaskPayload,
    responses((status = 201, description = "Tarefa criada", body = Task)),
    security(("api_jwt" = []))
)]
pub async fn create_task(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let task = app_state.task_service.create(&profile, &payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

// GET /api/tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    params(TaskFilter),
    responses((status = 200, description = "Tarefas visíveis", body = [Task])),
    security(("api_jwt" = []))
)]
pub async fn list_tasks(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Query(filter): Query<TaskFilter>,
) -> Result<impl IntoResponse, AppError> {
    let tasks = app_state.task_service.list(&profile, &filter).await?;
    Ok((StatusCode::OK, Json(tasks)))
}

// PATCH /api/tasks/{id}
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    request_body = UpdateTaskPayload,
    responses(
        (status = 200, description = "Tarefa atualizada", body = Task),
        (status = 403, description = "O responsável só altera o status")
    ),
    params(("id" = Uuid, Path, description = "ID da tarefa")),
    security(("api_jwt" = []))
)]
pub async fn update_task(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let task = app_state.task_service.update(&profile, id, &payload).await?;
    Ok((StatusCode::OK, Json(task)))
}
