// src/handlers/settings.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::settings::{FeedbackFormSettings, FormSettingsQuery, UpdateFormSettingsRequest},
};

// GET /api/public/form-settings
#[utoipa::path(
    get,
    path = "/api/public/form-settings",
    tag = "Public",
    params(FormSettingsQuery),
    responses((status = 200, description = "Configuração do formulário (filial, padrão ou embutida)", body = FeedbackFormSettings))
)]
pub async fn get_form_settings(
    State(app_state): State<AppState>,
    Query(query): Query<FormSettingsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let settings = app_state.settings_service.public_settings(query.branch_id).await?;
    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/form-settings
#[utoipa::path(
    put,
    path = "/api/form-settings",
    tag = "Settings",
    request_body = UpdateFormSettingsRequest,
    responses(
        (status = 200, description = "Configuração salva", body = FeedbackFormSettings),
        (status = 403, description = "Sem acesso de escrita à filial (padrão: só admin)")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_form_settings(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Json(payload): Json<UpdateFormSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let updated = app_state.settings_service.update(&profile, &payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}
