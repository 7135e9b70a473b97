// src/handlers/analytics.rs

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
    models::analytics::{FeedbackSummary, InsightRequest, InsightResponse, SummaryQuery},
};

// GET /api/analytics/summary
#[utoipa::path(
    get,
    path = "/api/analytics/summary",
    tag = "Analytics",
    params(SummaryQuery),
    responses((status = 200, description = "Estatísticas sobre os feedbacks visíveis", body = FeedbackSummary)),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.analytics_service.summary(&profile, &query).await?;
    Ok((StatusCode::OK, Json(summary)))
}

// POST /api/analytics/insights
#[utoipa::path(
    post,
    path = "/api/analytics/insights",
    tag = "Analytics",
    request_body = InsightRequest,
    responses(
        (status = 200, description = "Análise (IA ou resumo local)", body = InsightResponse),
        (status = 402, description = "Cota mensal esgotada ou plano sem IA")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_insights(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Json(payload): Json<InsightRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state.analytics_service.insights(&profile, &payload).await?;
    Ok((StatusCode::OK, Json(response)))
}
