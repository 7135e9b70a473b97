// src/services/team_service.rs

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::WithWarnings},
    db::{BranchRepository, ProfileRepository, TeamRepository},
    integrations::email::EmailSender,
    models::{
        profile::{Profile, Role},
        team::{AddMemberPayload, CreateTeamPayload, InviteOutcome, InvitePayload, Team, TeamInvitation, TeamMember},
    },
    policy::{
        access::can_manage_branch,
        team::{
            ensure_no_live_invitation, invitation_expiry, normalize_email, team_access, visible_teams,
            with_effective_status, TeamAccess,
        },
    },
    services::notifications,
};

const DEFAULT_MEMBER_ROLE: &str = "member";

#[derive(Clone)]
pub struct TeamService {
    team_repo: TeamRepository,
    profile_repo: ProfileRepository,
    branch_repo: BranchRepository,
    email: Arc<dyn EmailSender>,
    app_base_url: String,
    invitation_ttl_days: i64,
    pool: PgPool,
}

impl TeamService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        team_repo: TeamRepository,
        profile_repo: ProfileRepository,
        branch_repo: BranchRepository,
        email: Arc<dyn EmailSender>,
        app_base_url: String,
        invitation_ttl_days: i64,
        pool: PgPool,
    ) -> Self {
        Self {
            team_repo,
            profile_repo,
            branch_repo,
            email,
            app_base_url,
            invitation_ttl_days,
            pool,
        }
    }

    pub async fn create(&self, creator: &Profile, input: &CreateTeamPayload) -> Result<Team, AppError> {
        if !can_manage_branch(&creator.actor(), input.branch_id) {
            return Err(AppError::Forbidden("Só o admin ou o gerente da filial cria equipes.".into()));
        }

        self.branch_repo
            .find_by_id(&self.pool, input.branch_id)
            .await?
            .ok_or_else(|| AppError::InvalidInput("Filial inválida.".into()))?;

        let manager_id = input.manager_id.unwrap_or(creator.id);
        if manager_id != creator.id {
            self.profile_repo
                .find_by_id(manager_id)
                .await?
                .ok_or_else(|| AppError::InvalidInput(format!("Perfil {} não existe.", manager_id)))?;
        }

        let team = self
            .team_repo
            .create(&self.pool, input.branch_id, input.name.trim(), input.description.as_deref(), manager_id)
            .await?;
        tracing::info!(team_id = %team.id, branch_id = %team.branch_id, "👥 Equipe criada");
        Ok(team)
    }

    pub async fn list(&self, viewer: &Profile) -> Result<Vec<Team>, AppError> {
        let actor = viewer.actor();
        if actor.role == Role::Unrecognized {
            return Ok(Vec::new());
        }
        let managed_branch = if actor.role == Role::Manager { actor.branch_id } else { None };
        let candidates = self
            .team_repo
            .list_visible(&self.pool, actor.is_admin(), managed_branch, actor.id)
            .await?;
        let member_of: HashSet<Uuid> = self.team_repo.team_ids_of_member(&self.pool, actor.id).await?.into_iter().collect();
        Ok(visible_teams(&actor, candidates, &member_of))
    }

    /// Carrega a equipe e o nível de acesso do ator sobre ela.
    pub async fn access(&self, viewer: &Profile, team_id: Uuid) -> Result<(Team, TeamAccess), AppError> {
        let team = self
            .team_repo
            .find_by_id(&self.pool, team_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipe {}", team_id)))?;
        let is_member = self.team_repo.is_member(&self.pool, team_id, viewer.id).await?;
        let access = team_access(&viewer.actor(), &team, is_member);
        Ok((team, access))
    }

    async fn require_manage(&self, viewer: &Profile, team_id: Uuid) -> Result<Team, AppError> {
        match self.access(viewer, team_id).await? {
            (team, TeamAccess::Manage) => Ok(team),
            _ => Err(AppError::Forbidden("Só o gerente da equipe pode fazer isso.".into())),
        }
    }

    // =========================================================================
    //  MEMBROS
    // =========================================================================

    pub async fn list_members(&self, viewer: &Profile, team_id: Uuid) -> Result<Vec<TeamMember>, AppError> {
        let (_, access) = self.access(viewer, team_id).await?;
        if access == TeamAccess::None {
            return Err(AppError::Forbidden("Sem acesso a esta equipe.".into()));
        }
        self.team_repo.list_members(&self.pool, team_id).await
    }

    pub async fn add_member(&self, manager: &Profile, team_id: Uuid, input: &AddMemberPayload) -> Result<TeamMember, AppError> {
        self.require_manage(manager, team_id).await?;

        self.profile_repo
            .find_by_id(input.profile_id)
            .await?
            .ok_or_else(|| AppError::InvalidInput(format!("Perfil {} não existe.", input.profile_id)))?;

        let role = input.role.as_deref().unwrap_or(DEFAULT_MEMBER_ROLE);
        self.team_repo.add_member(&self.pool, team_id, input.profile_id, role).await
    }

    pub async fn remove_member(&self, manager: &Profile, team_id: Uuid, profile_id: Uuid) -> Result<(), AppError> {
        self.require_manage(manager, team_id).await?;
        if !self.team_repo.remove_member(&self.pool, team_id, profile_id).await? {
            return Err(AppError::NotFound("Membro da equipe".into()));
        }
        Ok(())
    }

    // =========================================================================
    //  CONVITES
    // =========================================================================

    /// Se o e-mail já tem conta, vira membro na hora. Senão cria um convite
    /// pendente (no máximo um válido por equipe + e-mail).
    pub async fn invite(
        &self,
        manager: &Profile,
        team_id: Uuid,
        input: &InvitePayload,
    ) -> Result<WithWarnings<InviteOutcome>, AppError> {
        let team = self.require_manage(manager, team_id).await?;
        let email = normalize_email(&input.email);
        let role = input.role.as_deref().unwrap_or(DEFAULT_MEMBER_ROLE);
        let now = Utc::now();

        if let Some(existing) = self.profile_repo.find_by_email(&self.pool, &email).await? {
            let member = self.team_repo.add_member(&self.pool, team_id, existing.id, role).await?;
            return Ok(WithWarnings::new(InviteOutcome::Added { member }));
        }

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        let expired = self.team_repo.expire_stale(&mut *tx, team_id, &email, now).await?;
        if expired > 0 {
            tracing::debug!(team_id = %team_id, expired, "Convites vencidos marcados como expirados");
        }

        let existing = self.team_repo.list_invitations_for_email(&mut *tx, team_id, &email).await?;
        ensure_no_live_invitation(&existing, team_id, &email, now)?;

        let invitation = self
            .team_repo
            .insert_invitation(
                &mut *tx,
                team_id,
                &email,
                role,
                manager.id,
                invitation_expiry(now, self.invitation_ttl_days),
            )
            .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!(team_id = %team_id, invitation_id = %invitation.id, "✉️ Convite criado");

        let mut result = WithWarnings::new(InviteOutcome::Invited { invitation });
        match signup_link(&self.app_base_url, &email) {
            Some(link) => {
                notifications::deliver(
                    self.email.as_ref(),
                    notifications::team_invitation(&email, &team.name, &link),
                    &mut result,
                )
                .await;
            }
            None => {
                tracing::warn!(base = %self.app_base_url, "APP_BASE_URL inválida: convite sem e-mail");
                result.warn(format!("Não foi possível enviar o e-mail para {}.", email));
            }
        }

        Ok(result)
    }

    /// Status efetivo: pendentes vencidos aparecem como expirados.
    pub async fn list_invitations(&self, manager: &Profile, team_id: Uuid) -> Result<Vec<TeamInvitation>, AppError> {
        self.require_manage(manager, team_id).await?;
        let now = Utc::now();
        let invitations = self.team_repo.list_invitations(&self.pool, team_id).await?;
        Ok(invitations
            .into_iter()
            .map(|inv| with_effective_status(inv, now))
            .collect())
    }
}

/// Link de cadastro com o e-mail codificado na query (`+` e `@` inclusive).
fn signup_link(base_url: &str, email: &str) -> Option<String> {
    let signup = format!("{}/signup", base_url.trim_end_matches('/'));
    reqwest::Url::parse_with_params(&signup, &[("email", email)])
        .ok()
        .map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_link_encodes_the_email() {
        let link = signup_link("https://app.loja.com/", "ana+vendas@loja.com").unwrap();
        assert_eq!(link, "https://app.loja.com/signup?email=ana%2Bvendas%40loja.com");
    }

    #[test]
    fn invalid_base_url_yields_no_link() {
        assert_eq!(signup_link("sem esquema", "ana@loja.com"), None);
    }
}
