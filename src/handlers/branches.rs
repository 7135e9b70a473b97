// src/handlers/branches.rs

use axum::{
    extract::{Path, State},
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
    models::branch::{Branch, CreateBranchPayload, PublicBranch, UpdateBranchPayload},
};

// GET /api/public/branches
#[utoipa::path(
    get,
    path = "/api/public/branches",
    tag = "Public",
    responses((status = 200, description = "Filiais ativas", body = [PublicBranch]))
)]
pub async fn list_public_branches(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let branches = app_state.branch_service.list_public().await?;
    Ok((StatusCode::OK, Json(branches)))
}

// GET /api/branches
#[utoipa::path(
    get,
    path = "/api/branches",
    tag = "Branches",
    responses((status = 200, description = "Filiais visíveis ao usuário", body = [Branch])),
    security(("api_jwt" = []))
)]
pub async fn list_branches(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let branches = app_state.branch_service.list_visible(&profile).await?;
    Ok((StatusCode::OK, Json(branches)))
}

// POST /api/branches
#[utoipa::path(
    post,
    path = "/api/branches",
    tag = "Branches",
    request_body = CreateBranchPayload,
    responses(
        (status = 201, description = "Filial criada", body = Branch),
        (status = 402, description = "Limite de filiais do plano"),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_branch(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Json(payload): Json<CreateBranchPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let branch = app_state.branch_service.create(&profile, &payload).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

// PATCH /api/branches/{id}
#[utoipa::path(
    patch,
    path = "/api/branches/{id}",
    tag = "Branches",
    request_body = UpdateBranchPayload,
    responses((status = 200, description = "Filial atualizada", body = Branch)),
    params(("id" = Uuid, Path, description = "ID da filial")),
    security(("api_jwt" = []))
)]
pub async fn update_branch(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBranchPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let branch = app_state.branch_service.update(&profile, id, &payload).await?;
    Ok((StatusCode::OK, Json(branch)))
}
