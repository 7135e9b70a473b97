// src/handlers/billing.rs

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::subscription::{CheckoutPayload, SessionUrl, SubscriptionStatus},
};

const STRIPE_SIGNATURE: &str = "stripe-signature";

// GET /api/billing/subscription
#[utoipa::path(
    get,
    path = "/api/billing/subscription",
    tag = "Billing",
    responses((status = 200, description = "Plano e recursos liberados", body = SubscriptionStatus)),
    security(("api_jwt" = []))
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let status = app_state.subscription_service.status(&profile).await?;
    Ok((StatusCode::OK, Json(status)))
}

// POST /api/billing/checkout
#[utoipa::path(
    post,
    path = "/api/billing/checkout",
    tag = "Billing",
    request_body = CheckoutPayload,
    responses(
        (status = 200, description = "URL do Stripe Checkout", body = SessionUrl),
        (status = 502, description = "Stripe indisponível")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_checkout(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Json(payload): Json<CheckoutPayload>,
) -> Result<impl IntoResponse, AppError> {
    let url = app_state.subscription_service.create_checkout(&profile, payload.tier).await?;
    Ok((StatusCode::OK, Json(SessionUrl { url })))
}

// POST /api/billing/portal
#[utoipa::path(
    post,
    path = "/api/billing/portal",
    tag = "Billing",
    responses((status = 200, description = "URL do portal de cobrança", body = SessionUrl)),
    security(("api_jwt" = []))
)]
pub async fn create_portal(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let url = app_state.subscription_service.create_portal(&profile).await?;
    Ok((StatusCode::OK, Json(SessionUrl { url })))
}

// POST /api/billing/webhook
// O corpo precisa chegar cru: a assinatura é calculada sobre os bytes exatos.
#[utoipa::path(
    post,
    path = "/api/billing/webhook",
    tag = "Billing",
    request_body(content = String, content_type = "application/json", description = "Evento do Stripe"),
    responses(
        (status = 200, description = "Evento aplicado"),
        (status = 400, description = "Assinatura inválida")
    ),
    params(("Stripe-Signature" = String, Header, description = "t=...,v1=..."))
)]
pub async fn stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(STRIPE_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidInput("Cabeçalho Stripe-Signature ausente.".into()))?;

    app_state.subscription_service.handle_webhook(&body, signature).await?;
    Ok(StatusCode::OK)
}
