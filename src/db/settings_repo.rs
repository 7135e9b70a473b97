// src/db/settings_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::settings::{FeedbackFormSettings, UpdateFormSettingsRequest},
};

const COLUMNS: &str = "branch_id, title, description, primary_color, logo_url, thank_you_message, \
                       require_category, collect_contact, updated_at";

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Configuração exata de uma filial (ou a padrão, com `None`).
    pub async fn find<'e, E>(&self, executor: E, branch_id: Option<Uuid>) -> Result<Option<FeedbackFormSettings>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {} FROM feedback_form_settings WHERE branch_id IS NOT DISTINCT FROM $1",
            COLUMNS
        );
        let settings = sqlx::query_as::<_, FeedbackFormSettings>(&sql)
            .bind(branch_id)
            .fetch_optional(executor)
            .await?;
        Ok(settings)
    }

    /// Filial -> padrão -> embutida.
    pub async fn resolve(&self, branch_id: Option<Uuid>) -> Result<FeedbackFormSettings, AppError> {
        if let Some(id) = branch_id {
            if let Some(s) = self.find(&self.pool, Some(id)).await? {
                return Ok(s);
            }
        }

        match self.find(&self.pool, None).await? {
            Some(s) => Ok(s),
            None => Ok(FeedbackFormSettings::builtin(branch_id)),
        }
    }

    pub async fn upsert<'e, E>(&self, executor: E, input: &UpdateFormSettingsRequest) -> Result<FeedbackFormSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // O índice da configuração padrão é parcial, por isso o alvo do ON CONFLICT muda.
        let conflict_target = if input.branch_id.is_some() {
            "(branch_id)"
        } else {
            "((branch_id IS NULL)) WHERE branch_id IS NULL"
        };

        let sql = format!(
            r#"
            INSERT INTO feedback_form_settings (
                branch_id, title, description, primary_color, logo_url,
                thank_you_message, require_category, collect_contact
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT {}
            DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                primary_color = EXCLUDED.primary_color,
                logo_url = EXCLUDED.logo_url,
                thank_you_message = EXCLUDED.thank_you_message,
                require_category = EXCLUDED.require_category,
                collect_contact = EXCLUDED.collect_contact,
                updated_at = NOW()
            RETURNING {}
            "#,
            conflict_target, COLUMNS
        );

        let settings = sqlx::query_as::<_, FeedbackFormSettings>(&sql)
            .bind(input.branch_id)
            .bind(&input.title)
            .bind(input.description.as_deref())
            .bind(input.primary_color.as_deref())
            .bind(input.logo_url.as_deref())
            .bind(input.thank_you_message.as_deref())
            .bind(input.require_category)
            .bind(input.collect_contact)
            .fetch_one(executor)
            .await?;
        Ok(settings)
    }
}
