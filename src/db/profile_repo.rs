// src/db/profile_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::profile::Profile};

// Repositório de perfis (tabela 'profiles'). O id é o do principal autenticado.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn find_by_id_with<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Profile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(profile)
    }

    pub async fn find_by_email<'e, E>(&self, executor: E, email: &str) -> Result<Option<Profile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(executor)
            .await?;
        Ok(profile)
    }

    /// Cria o perfil com papel 'user'.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        email: &str,
        full_name: Option<&str>,
        branch_id: Option<Uuid>,
    ) -> Result<Profile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, full_name, role, branch_id)
            VALUES ($1, $2, $3, 'user', $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(full_name)
        .bind(branch_id)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, format!("O e-mail {} já possui um perfil.", email)))
    }

    pub async fn list_all<'e, E>(&self, executor: E) -> Result<Vec<Profile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profiles = sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY created_at ASC")
            .fetch_all(executor)
            .await?;
        Ok(profiles)
    }

    pub async fn list_by_branch<'e, E>(&self, executor: E, branch_id: Uuid) -> Result<Vec<Profile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profiles = sqlx::query_as::<_, Profile>(
            "SELECT * FROM profiles WHERE branch_id = $1 ORDER BY created_at ASC",
        )
        .bind(branch_id)
        .fetch_all(executor)
        .await?;
        Ok(profiles)
    }

    pub async fn update_full_name<'e, E>(&self, executor: E, id: Uuid, full_name: &str) -> Result<Profile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET full_name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(full_name)
        .fetch_one(executor)
        .await?;
        Ok(profile)
    }

    /// Papel e filial. `branch_id = None` mantém a filial atual; `Some(None)` remove.
    pub async fn update_role_and_branch<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        role: Option<&str>,
        branch_id: Option<Option<Uuid>>,
    ) -> Result<Option<Profile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET
                role = COALESCE($2, role),
                branch_id = CASE WHEN $3 THEN $4 ELSE branch_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(role)
        .bind(branch_id.is_some())
        .bind(branch_id.flatten())
        .fetch_optional(executor)
        .await?;
        Ok(profile)
    }
}
