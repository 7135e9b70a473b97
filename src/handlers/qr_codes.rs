// src/handlers/qr_codes.rs

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::qr::{CreateQrCodePayload, QrCode, UpdateQrCodePayload},
};

// POST /api/qr-codes
#[utoipa::path(
    post,
    path = "/api/qr-codes",
    tag = "QR Codes",
    request_body = CreateQrCodePayload,
    responses(
        (status = 201, description = "QR code criado", body = QrCode),
        (status = 403, description = "Apenas admin ou gerente da filial")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_qr_code(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Json(payload): Json<CreateQrCodePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let qr = app_state.qr_service.create(&profile, &payload).await?;
    Ok((StatusCode::CREATED, Json(qr)))
}

// GET /api/qr-codes
#[utoipa::path(
    get,
    path = "/api/qr-codes",
    tag = "QR Codes",
    responses((status = 200, description = "QR codes visíveis", body = [QrCode])),
    security(("api_jwt" = []))
)]
pub async fn list_qr_codes(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let codes = app_state.qr_service.list(&profile).await?;
    Ok((StatusCode::OK, Json(codes)))
}

// PATCH /api/qr-codes/{id}
#[utoipa::path(
    patch,
    path = "/api/qr-codes/{id}",
    tag = "QR Codes",
    request_body = UpdateQrCodePayload,
    responses((status = 200, description = "QR code renomeado/desativado", body = QrCode)),
    params(("id" = Uuid, Path, description = "ID do QR code")),
    security(("api_jwt" = []))
)]
pub async fn update_qr_code(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQrCodePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let qr = app_state.qr_service.update(&profile, id, &payload).await?;
    Ok((StatusCode::OK, Json(qr)))
}

// GET /api/qr-codes/{id}/image
#[utoipa::path(
    get,
    path = "/api/qr-codes/{id}/image",
    tag = "QR Codes",
    responses((status = 200, description = "Imagem PNG (image/png)")),
    params(("id" = Uuid, Path, description = "ID do QR code")),
    security(("api_jwt" = []))
)]
pub async fn qr_code_image(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let png = app_state.qr_service.image(&profile, id).await?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], png))
}
