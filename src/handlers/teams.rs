// src/handlers/teams.rs

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
    models::team::{AddMemberPayload, CreateTeamPayload, InviteOutcome, InvitePayload, Team, TeamInvitation, TeamMember},
};

// POST /api/teams
#[utoipa::path(
    post,
    path = "/api/teams",
    tag = "Teams",
    request_body = CreateTeamPayload,
    responses((status = 201, description = "Equipe criada", body = Team)),
    security(("api_jwt" = []))
)]
pub async fn create_team(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Json(payload): Json<CreateTeamPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let team = app_state.team_service.create(&profile, &payload).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

// GET /api/teams
#[utoipa::path(
    get,
    path = "/api/teams",
    tag = "Teams",
    responses((status = 200, description = "Equipes que o usuário gerencia ou integra", body = [Team])),
    security(("api_jwt" = []))
)]
pub async fn list_teams(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let teams = app_state.team_service.list(&profile).await?;
    Ok((StatusCode::OK, Json(teams)))
}

// GET /api/teams/{id}/members
#[utoipa::path(
    get,
    path = "/api/teams/{id}/members",
    tag = "Teams",
    responses((status = 200, description = "Membros", body = [TeamMember])),
    params(("id" = Uuid, Path, description = "ID da equipe")),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let members = app_state.team_service.list_members(&profile, id).await?;
    Ok((StatusCode::OK, Json(members)))
}

// POST /api/teams/{id}/members
#[utoipa::path(
    post,
    path = "/api/teams/{id}/members",
    tag = "Teams",
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Membro adicionado", body = TeamMember),
        (status = 409, description = "Já é membro")
    ),
    params(("id" = Uuid, Path, description = "ID da equipe")),
    security(("api_jwt" = []))
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let member = app_state.team_service.add_member(&profile, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

// DELETE /api/teams/{id}/members/{profile_id}
#[utoipa::path(
    delete,
    path = "/api/teams/{id}/members/{profile_id}",
    tag = "Teams",
    responses(
        (status = 204, description = "Membro removido"),
        (status = 404, description = "Não é membro")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da equipe"),
        ("profile_id" = Uuid, Path, description = "ID do perfil")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_member(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path((id, profile_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state.team_service.remove_member(&profile, id, profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/teams/{id}/invitations
#[utoipa::path(
    post,
    path = "/api/teams/{id}/invitations",
    tag = "Teams",
    request_body = InvitePayload,
    responses(
        (status = 201, description = "Convite criado ou membro adicionado direto", body = InviteOutcome),
        (status = 409, description = "Já existe convite pendente")
    ),
    params(("id" = Uuid, Path, description = "ID da equipe")),
    security(("api_jwt" = []))
)]
pub async fn invite(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvitePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let outcome = app_state.team_service.invite(&profile, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

// GET /api/teams/{id}/invitations
#[utoipa::path(
    get,
    path = "/api/teams/{id}/invitations",
    tag = "Teams",
    responses((status = 200, description = "Convites com o status efetivo", body = [TeamInvitation])),
    params(("id" = Uuid, Path, description = "ID da equipe")),
    security(("api_jwt" = []))
)]
pub async fn list_invitations(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invitations = app_state.team_service.list_invitations(&profile, id).await?;
    Ok((StatusCode::OK, Json(invitations)))
}
