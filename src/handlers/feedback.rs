// src/handlers/feedback.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        subscription::{DataExport, RequireFeature, Translation},
    },
    models::feedback::{
        CreateCategoryPayload, CreateResponsePayload, FeedbackCategory, FeedbackFilter, FeedbackReceipt,
        FeedbackResponse, FeedbackView, SubmitFeedbackPayload, TranslateFeedbackPayload, TranslatedFeedback,
        UpdateFeedbackPayload,
    },
};

// =============================================================================
//  CATEGORIAS
// =============================================================================

// GET /api/public/categories
#[utoipa::path(
    get,
    path = "/api/public/categories",
    tag = "Public",
    responses((status = 200, description = "Categorias ativas", body = [FeedbackCategory]))
)]
pub async fn list_categories(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories = app_state.feedback_service.list_categories().await?;
    Ok((StatusCode::OK, Json(categories)))
}

// POST /api/categories
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Feedback",
    request_body = CreateCategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = FeedbackCategory),
        (status = 409, description = "Nome já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let category = app_state.feedback_service.create_category(&profile, &payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

// =============================================================================
//  ENVIO PÚBLICO
// =============================================================================

// POST /api/public/feedback
#[utoipa::path(
    post,
    path = "/api/public/feedback",
    tag = "Public",
    request_body = SubmitFeedbackPayload,
    responses(
        (status = 201, description = "Feedback recebido", body = FeedbackReceipt),
        (status = 400, description = "Campos inválidos"),
        (status = 402, description = "O plano do dono do QR code não inclui coleta")
    )
)]
pub async fn submit_feedback(
    State(app_state): State<AppState>,
    Json(payload): Json<SubmitFeedbackPayload>,
) -> Result<impl IntoResponse, AppError> {
    // A validação roda no serviço, depois da normalização
    let receipt = app_state.feedback_service.submit(payload).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// =============================================================================
//  LEITURA E TRIAGEM
// =============================================================================

// GET /api/feedback
#[utoipa::path(
    get,
    path = "/api/feedback",
    tag = "Feedback",
    params(FeedbackFilter),
    responses((status = 200, description = "Feedbacks visíveis, já projetados", body = [FeedbackView])),
    security(("api_jwt" = []))
)]
pub async fn list_feedback(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Query(filter): Query<FeedbackFilter>,
) -> Result<impl IntoResponse, AppError> {
    let items = app_state.feedback_service.list(&profile, &filter).await?;
    Ok((StatusCode::OK, Json(items)))
}

// GET /api/feedback/{id}
#[utoipa::path(
    get,
    path = "/api/feedback/{id}",
    tag = "Feedback",
    responses(
        (status = 200, description = "Feedback", body = FeedbackView),
        (status = 403, description = "Sem acesso"),
        (status = 404, description = "Não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do feedback")),
    security(("api_jwt" = []))
)]
pub async fn get_feedback(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.feedback_service.get(&profile, id).await?;
    Ok((StatusCode::OK, Json(view)))
}

// PATCH /api/feedback/{id}
#[utoipa::path(
    patch,
    path = "/api/feedback/{id}",
    tag = "Feedback",
    request_body = UpdateFeedbackPayload,
    responses(
        (status = 200, description = "Feedback atualizado (com `warnings` se o aviso por e-mail falhar)", body = FeedbackView),
        (status = 403, description = "Sem acesso de escrita")
    ),
    params(("id" = Uuid, Path, description = "ID do feedback")),
    security(("api_jwt" = []))
)]
pub async fn update_feedback(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFeedbackPayload>,
) -> Result<impl IntoResponse, AppError> {
    let updated = app_state.feedback_service.update(&profile, id, &payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

// GET /api/feedback/{id}/responses
#[utoipa::path(
    get,
    path = "/api/feedback/{id}/responses",
    tag = "Feedback",
    responses((status = 200, description = "Respostas do feedback", body = [FeedbackResponse])),
    params(("id" = Uuid, Path, description = "ID do feedback")),
    security(("api_jwt" = []))
)]
pub async fn list_responses(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let responses = app_state.feedback_service.list_responses(&profile, id).await?;
    Ok((StatusCode::OK, Json(responses)))
}

// POST /api/feedback/{id}/responses
#[utoipa::path(
    post,
    path = "/api/feedback/{id}/responses",
    tag = "Feedback",
    request_body = CreateResponsePayload,
    responses(
        (status = 201, description = "Resposta registrada", body = FeedbackResponse),
        (status = 403, description = "Só o responsável ou o gerente da filial")
    ),
    params(("id" = Uuid, Path, description = "ID do feedback")),
    security(("api_jwt" = []))
)]
pub async fn add_response(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateResponsePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = app_state.feedback_service.add_response(&profile, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// GET /api/feedback/export
#[utoipa::path(
    get,
    path = "/api/feedback/export",
    tag = "Feedback",
    responses(
        (status = 200, description = "Arquivo JSON com os feedbacks visíveis", body = [FeedbackView]),
        (status = 402, description = "Disponível apenas no plano pro")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_feedback(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    _guard: RequireFeature<DataExport>,
) -> Result<impl IntoResponse, AppError> {
    let items = app_state.feedback_service.export(&profile).await?;
    let filename = format!("feedback-{}.json", chrono::Utc::now().format("%Y-%m-%d"));

    Ok((
        StatusCode::OK,
        [(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename))],
        Json(items),
    ))
}

// POST /api/feedback/{id}/translate
#[utoipa::path(
    post,
    path = "/api/feedback/{id}/translate",
    tag = "Feedback",
    request_body = TranslateFeedbackPayload,
    responses(
        (status = 200, description = "Texto traduzido (ou o original com `translated: false`)", body = TranslatedFeedback),
        (status = 402, description = "Tradução não incluída no plano")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do feedback"),
        ("Accept-Language" = Option<String>, Header, description = "Idioma padrão quando `targetLanguage` não vem no corpo")
    ),
    security(("api_jwt" = []))
)]
pub async fn translate_feedback(
    State(app_state): State<AppState>,
    Locale(locale): Locale,
    AuthenticatedUser(profile): AuthenticatedUser,
    _guard: RequireFeature<Translation>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TranslateFeedbackPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let target = payload.target_language.unwrap_or(locale);

    let translated = app_state.feedback_service.translate(&profile, id, &target).await?;
    Ok((StatusCode::OK, Json(translated)))
}
