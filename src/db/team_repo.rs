// src/db/team_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::team::{Team, TeamInvitation, TeamMember},
};

#[derive(Clone)]
pub struct TeamRepository {
    pool: PgPool,
}

impl TeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  EQUIPES
    // =========================================================================

    pub async fn create<'e, E>(
        &self,
        executor: E,
        branch_id: Uuid,
        name: &str,
        description: Option<&str>,
        manager_id: Uuid,
    ) -> Result<Team, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (branch_id, name, description, manager_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(branch_id)
        .bind(name)
        .bind(description)
        .bind(manager_id)
        .fetch_one(executor)
        .await?;
        Ok(team)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Team>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(team)
    }

    /// Pré-filtro SQL das equipes visíveis: todas (admin), as da filial gerida,
    /// as que o principal gerencia e aquelas de que é membro. O serviço ainda
    /// passa cada linha por `policy::team::team_access`.
    pub async fn list_visible<'e, E>(
        &self,
        executor: E,
        all: bool,
        managed_branch: Option<Uuid>,
        principal_id: Uuid,
    ) -> Result<Vec<Team>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT t.* FROM teams t
            WHERE $1
               OR t.branch_id = $2
               OR t.manager_id = $3
               OR EXISTS (SELECT 1 FROM team_members m WHERE m.team_id = t.id AND m.profile_id = $3)
            ORDER BY t.name ASC
            "#,
        )
        .bind(all)
        .bind(managed_branch)
        .bind(principal_id)
        .fetch_all(executor)
        .await?;
        Ok(teams)
    }

    pub async fn find_by_ids<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Team>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let teams = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(teams)
    }

    // =========================================================================
    //  MEMBROS
    // =========================================================================

    pub async fn is_member<'e, E>(&self, executor: E, team_id: Uuid, profile_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM team_members WHERE team_id = $1 AND profile_id = $2)",
        )
        .bind(team_id)
        .bind(profile_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    /// Equipes das quais o perfil é membro.
    pub async fn team_ids_of_member<'e, E>(&self, executor: E, profile_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT team_id FROM team_members WHERE profile_id = $1")
            .bind(profile_id)
            .fetch_all(executor)
            .await?;
        Ok(ids)
    }

    pub async fn list_members<'e, E>(&self, executor: E, team_id: Uuid) -> Result<Vec<TeamMember>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let members = sqlx::query_as::<_, TeamMember>(
            "SELECT * FROM team_members WHERE team_id = $1 ORDER BY joined_at ASC",
        )
        .bind(team_id)
        .fetch_all(executor)
        .await?;
        Ok(members)
    }

    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        team_id: Uuid,
        profile_id: Uuid,
        role: &str,
    ) -> Result<TeamMember, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (team_id, profile_id, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(team_id)
        .bind(profile_id)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Este perfil já é membro da equipe."))
    }

    /// Variante idempotente usada na aceitação automática de convites.
    pub async fn add_member_if_absent<'e, E>(
        &self,
        executor: E,
        team_id: Uuid,
        profile_id: Uuid,
        role: &str,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO team_members (team_id, profile_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (team_id, profile_id) DO NOTHING
            "#,
        )
        .bind(team_id)
        .bind(profile_id)
        .bind(role)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_member<'e, E>(&self, executor: E, team_id: Uuid, profile_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND profile_id = $2")
            .bind(team_id)
            .bind(profile_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  CONVITES
    // =========================================================================

    pub async fn list_invitations<'e, E>(&self, executor: E, team_id: Uuid) -> Result<Vec<TeamInvitation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invitations = sqlx::query_as::<_, TeamInvitation>(
            "SELECT * FROM team_invitations WHERE team_id = $1 ORDER BY created_at DESC",
        )
        .bind(team_id)
        .fetch_all(executor)
        .await?;
        Ok(invitations)
    }

    pub async fn list_invitations_for_email<'e, E>(
        &self,
        executor: E,
        team_id: Uuid,
        email: &str,
    ) -> Result<Vec<TeamInvitation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invitations = sqlx::query_as::<_, TeamInvitation>(
            "SELECT * FROM team_invitations WHERE team_id = $1 AND lower(email) = lower($2)",
        )
        .bind(team_id)
        .bind(email)
        .fetch_all(executor)
        .await?;
        Ok(invitations)
    }

    /// Persiste a expiração preguiçosa: pendentes vencidos viram 'expired'.
    /// Libera o índice único parcial para um novo convite.
    pub async fn expire_stale<'e, E>(
        &self,
        executor: E,
        team_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE team_invitations SET status = 'expired'
            WHERE team_id = $1 AND lower(email) = lower($2)
              AND status = 'pending' AND expires_at <= $3
            "#,
        )
        .bind(team_id)
        .bind(email)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_invitation<'e, E>(
        &self,
        executor: E,
        team_id: Uuid,
        email: &str,
        role: &str,
        invited_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<TeamInvitation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TeamInvitation>(
            r#"
            INSERT INTO team_invitations (team_id, email, role, invited_by, status, expires_at)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING *
            "#,
        )
        .bind(team_id)
        .bind(email)
        .bind(role)
        .bind(invited_by)
        .bind(expires_at)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, format!("Já existe um convite pendente para {} nesta equipe.", email)))
    }

    /// Marca como aceitos todos os convites pendentes e válidos do e-mail.
    /// O `WHERE status = 'pending'` garante que cada convite converte uma vez só.
    pub async fn accept_pending_for_email<'e, E>(
        &self,
        executor: E,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<TeamInvitation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let accepted = sqlx::query_as::<_, TeamInvitation>(
            r#"
            UPDATE team_invitations SET status = 'accepted', accepted_at = $2
            WHERE lower(email) = lower($1) AND status = 'pending' AND expires_at > $2
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(now)
        .fetch_all(executor)
        .await?;
        Ok(accepted)
    }
}
