// src/db/branch_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::branch::{Branch, PublicBranch, UpdateBranchPayload},
};

#[derive(Clone)]
pub struct BranchRepository {
    pool: PgPool,
}

impl BranchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Para o formulário público: só id, nome e endereço das ativas.
    pub async fn list_public(&self) -> Result<Vec<PublicBranch>, AppError> {
        let branches = sqlx::query_as::<_, PublicBranch>(
            "SELECT id, name, location FROM branches WHERE is_active ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(branches)
    }

    pub async fn list_all<'e, E>(&self, executor: E) -> Result<Vec<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branches = sqlx::query_as::<_, Branch>("SELECT * FROM branches ORDER BY is_default DESC, name ASC")
            .fetch_all(executor)
            .await?;
        Ok(branches)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branch = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(branch)
    }

    /// A filial padrão, destino dos novos cadastros.
    pub async fn find_default<'e, E>(&self, executor: E) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branch = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE is_default LIMIT 1")
            .fetch_optional(executor)
            .await?;
        Ok(branch)
    }

    /// Filiais que contam para o limite do plano (a padrão não conta).
    pub async fn count_countable<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM branches WHERE NOT is_default")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        location: Option<&str>,
        manager_id: Option<Uuid>,
    ) -> Result<Branch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO branches (name, location, manager_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(location)
        .bind(manager_id)
        .fetch_one(executor)
        .await?;
        Ok(branch)
    }

    pub async fn update<'e, E>(&self, executor: E, id: Uuid, input: &UpdateBranchPayload) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            UPDATE branches SET
                name = COALESCE($2, name),
                location = COALESCE($3, location),
                manager_id = CASE WHEN $4 THEN $5 ELSE manager_id END,
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref())
        .bind(input.location.as_deref())
        .bind(input.manager_id.is_some())
        .bind(input.manager_id.flatten())
        .bind(input.is_active)
        .fetch_optional(executor)
        .await?;
        Ok(branch)
    }
}
