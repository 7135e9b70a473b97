// src/handlers/profiles.rs

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
    models::profile::{AdminUpdateProfilePayload, Profile, UpdateOwnProfilePayload},
};

// GET /api/profiles/me
#[utoipa::path(
    get,
    path = "/api/profiles/me",
    tag = "Profiles",
    responses((status = 200, description = "Perfil do usuário autenticado", body = Profile)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(profile): AuthenticatedUser) -> Json<Profile> {
    Json(profile)
}

// PATCH /api/profiles/me
#[utoipa::path(
    patch,
    path = "/api/profiles/me",
    tag = "Profiles",
    request_body = UpdateOwnProfilePayload,
    responses((status = 200, description = "Nome atualizado", body = Profile)),
    security(("api_jwt" = []))
)]
pub async fn update_me(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Json(payload): Json<UpdateOwnProfilePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let updated = app_state
        .profile_service
        .update_own_name(&profile, payload.full_name.trim())
        .await?;

    Ok((StatusCode::OK, Json(updated)))
}

// GET /api/profiles
#[utoipa::path(
    get,
    path = "/api/profiles",
    tag = "Profiles",
    responses((status = 200, description = "Perfis visíveis (admin: todos; gerente: a filial; demais: o próprio)", body = [Profile])),
    security(("api_jwt" = []))
)]
pub async fn list_profiles(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let profiles = app_state.profile_service.list_visible(&profile).await?;
    Ok((StatusCode::OK, Json(profiles)))
}

// PATCH /api/profiles/{id}
#[utoipa::path(
    patch,
    path = "/api/profiles/{id}",
    tag = "Profiles",
    request_body = AdminUpdateProfilePayload,
    responses(
        (status = 200, description = "Papel/filial alterados", body = Profile),
        (status = 403, description = "Apenas administradores")
    ),
    params(("id" = Uuid, Path, description = "ID do perfil")),
    security(("api_jwt" = []))
)]
pub async fn admin_update_profile(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminUpdateProfilePayload>,
) -> Result<impl IntoResponse, AppError> {
    let updated = app_state.profile_service.admin_update(&admin, id, &payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}
