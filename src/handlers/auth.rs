// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedPrincipal,
    models::profile::{ProvisionPayload, ProvisionedProfile},
};

// POST /api/auth/provision
// Chamado pelo front logo após o cadastro no provedor de autenticação. Idempotente.
#[utoipa::path(
    post,
    path = "/api/auth/provision",
    tag = "Auth",
    request_body = ProvisionPayload,
    responses(
        (status = 201, description = "Perfil criado (convites pendentes aceitos)", body = ProvisionedProfile),
        (status = 200, description = "Perfil já existia", body = ProvisionedProfile),
        (status = 401, description = "Token inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn provision(
    State(app_state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    payload: Option<Json<ProvisionPayload>>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.unwrap_or_default();
    payload.validate()?;

    let provisioned = app_state
        .auth_service
        .provision(&principal, payload.full_name.as_deref())
        .await?;

    let status = if provisioned.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(provisioned)))
}
