// src/db/usage_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

// Log de chamadas pagas (IA). A cota mensal é a contagem deste log.
#[derive(Clone)]
pub struct UsageRepository {
    pool: PgPool,
}

impl UsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count_since(&self, user_id: Uuid, feature: &str, since: DateTime<Utc>) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ai_usage_events WHERE user_id = $1 AND feature = $2 AND created_at >= $3",
        )
        .bind(user_id)
        .bind(feature)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn record<'e, E>(&self, executor: E, user_id: Uuid, feature: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO ai_usage_events (user_id, feature) VALUES ($1, $2)")
            .bind(user_id)
            .bind(feature)
            .execute(executor)
            .await?;
        Ok(())
    }
}
