// src/db/qr_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::FeedbackScope,
    models::qr::QrCode,
};

#[derive(Clone)]
pub struct QrCodeRepository {
    pool: PgPool,
}

impl QrCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// O id vem do serviço, porque a URL de destino já o contém.
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        owner_id: Uuid,
        branch_id: Uuid,
        category_id: Option<Uuid>,
        name: &str,
        target_url: &str,
        image_ref: &str,
    ) -> Result<QrCode, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let code = sqlx::query_as::<_, QrCode>(
            r#"
            INSERT INTO qr_codes (id, owner_id, branch_id, category_id, name, target_url, image_ref)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(branch_id)
        .bind(category_id)
        .bind(name)
        .bind(target_url)
        .bind(image_ref)
        .fetch_one(executor)
        .await?;
        Ok(code)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<QrCode>, AppError> {
        let code = sqlx::query_as::<_, QrCode>("SELECT * FROM qr_codes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(code)
    }

    /// Mesmo escopo do feedback, com o dono no lugar do responsável.
    pub async fn list_scoped<'e, E>(&self, executor: E, scope: FeedbackScope) -> Result<Vec<QrCode>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let codes = sqlx::query_as::<_, QrCode>(
            r#"
            SELECT * FROM qr_codes
            WHERE ($1 OR branch_id = $2 OR (owner_id = $3 AND branch_id = $4))
            ORDER BY created_at DESC
            "#,
        )
        .bind(scope.all)
        .bind(scope.branch_id)
        .bind(scope.principal_id)
        .bind(scope.principal_branch_id)
        .fetch_all(executor)
        .await?;
        Ok(codes)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<QrCode, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let code = sqlx::query_as::<_, QrCode>(
            r#"
            UPDATE qr_codes SET
                name = COALESCE($2, name),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(is_active)
        .fetch_one(executor)
        .await?;
        Ok(code)
    }

    pub async fn increment_scan<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE qr_codes SET scan_count = scan_count + 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
