// src/services/settings_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, SettingsRepository},
    models::{
        profile::Profile,
        settings::{FeedbackFormSettings, UpdateFormSettingsRequest},
    },
    policy::access::can_edit_form_settings,
};

#[derive(Clone)]
pub struct SettingsService {
    settings_repo: SettingsRepository,
    branch_repo: BranchRepository,
    pool: PgPool,
}

impl SettingsService {
    pub fn new(settings_repo: SettingsRepository, branch_repo: BranchRepository, pool: PgPool) -> Self {
        Self { settings_repo, branch_repo, pool }
    }

    pub async fn public_settings(&self, branch_id: Option<Uuid>) -> Result<FeedbackFormSettings, AppError> {
        self.settings_repo.resolve(branch_id).await
    }

    pub async fn update(&self, editor: &Profile, input: &UpdateFormSettingsRequest) -> Result<FeedbackFormSettings, AppError> {
        if !can_edit_form_settings(&editor.actor(), input.branch_id) {
            return Err(AppError::Forbidden("Sem permissão para alterar este formulário.".into()));
        }

        if let Some(branch_id) = input.branch_id {
            self.branch_repo
                .find_by_id(&self.pool, branch_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Filial {}", branch_id)))?;
        }

        self.settings_repo.upsert(&self.pool, input).await
    }
}
