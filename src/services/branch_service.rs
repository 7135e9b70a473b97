// src/services/branch_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, ProfileRepository},
    models::{
        branch::{Branch, CreateBranchPayload, PublicBranch, UpdateBranchPayload},
        profile::Profile,
    },
    policy::{
        access::{branch_access, can_manage_branch, check_designated_manager},
        subscription::check_branch_limit,
    },
    services::subscription_service::SubscriptionService,
};

#[derive(Clone)]
pub struct BranchService {
    branch_repo: BranchRepository,
    profile_repo: ProfileRepository,
    subscriptions: SubscriptionService,
    pool: PgPool,
}

impl BranchService {
    pub fn new(
        branch_repo: BranchRepository,
        profile_repo: ProfileRepository,
        subscriptions: SubscriptionService,
        pool: PgPool,
    ) -> Self {
        Self { branch_repo, profile_repo, subscriptions, pool }
    }

    pub async fn list_public(&self) -> Result<Vec<PublicBranch>, AppError> {
        self.branch_repo.list_public().await
    }

    pub async fn list_visible(&self, viewer: &Profile) -> Result<Vec<Branch>, AppError> {
        let actor = viewer.actor();
        let branches = self.branch_repo.list_all(&self.pool).await?;
        Ok(branches
            .into_iter()
            .filter(|b| branch_access(&actor, b).can_read())
            .collect())
    }

    pub async fn create(&self, creator: &Profile, input: &CreateBranchPayload) -> Result<Branch, AppError> {
        if !creator.actor().is_admin() {
            return Err(AppError::Forbidden("Só administradores criam filiais.".into()));
        }

        let tier = self.subscriptions.current_tier(creator).await?;
        let existing = self.branch_repo.count_countable(&self.pool).await?;
        check_branch_limit(tier, existing)?;

        if let Some(manager_id) = input.manager_id {
            let manager = self.load_profile(manager_id).await?;
            check_designated_manager(&manager.actor(), None)?;
        }

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        let branch = self
            .branch_repo
            .create(&mut *tx, input.name.trim(), input.location.as_deref(), input.manager_id)
            .await?;

        // O gerente designado passa a pertencer à filial nova
        if let Some(manager_id) = input.manager_id {
            self.profile_repo
                .update_role_and_branch(&mut *tx, manager_id, None, Some(Some(branch.id)))
                .await?;
        }

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!(branch_id = %branch.id, name = %branch.name, "🏢 Filial criada");
        Ok(branch)
    }

    /// Gerente da filial edita nome/endereço; gerente designado e ativação são do admin.
    pub async fn update(&self, editor: &Profile, id: Uuid, input: &UpdateBranchPayload) -> Result<Branch, AppError> {
        let actor = editor.actor();
        let allowed = if input.touches_admin_fields() {
            actor.is_admin()
        } else {
            can_manage_branch(&actor, id)
        };
        if !allowed {
            return Err(AppError::Forbidden("Sem permissão para alterar esta filial.".into()));
        }

        if let Some(Some(manager_id)) = input.manager_id {
            let manager = self.load_profile(manager_id).await?;
            check_designated_manager(&manager.actor(), Some(id))?;
        }

        self.branch_repo
            .update(&self.pool, id, input)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Filial {}", id)))
    }

    async fn load_profile(&self, id: Uuid) -> Result<Profile, AppError> {
        self.profile_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::InvalidInput(format!("Perfil {} não existe.", id)))
    }
}
