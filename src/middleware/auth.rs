// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::profile::{Principal, Profile},
};

fn bearer_principal(
    app_state: &AppState,
    header: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Principal, AppError> {
    let TypedHeader(Authorization(bearer)) = header.ok_or(AppError::InvalidToken)?;
    app_state.auth_service.validate_token(bearer.token())
}

/// Só valida o token. Usado pelo provisionamento, quando o perfil ainda não existe.
pub async fn principal_guard(
    State(app_state): State<AppState>,
    header: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = bearer_principal(&app_state, header)?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Valida o token e resolve o perfil uma vez por requisição.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    header: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = bearer_principal(&app_state, header)?;
    let profile = app_state.auth_service.resolve_profile(&principal).await?;

    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(profile);
    Ok(next.run(request).await)
}

// Extrator para obter o perfil autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub Profile);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Profile>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidToken)
    }
}

pub struct AuthenticatedPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedPrincipal)
            .ok_or(AppError::InvalidToken)
    }
}
