// src/services/profile_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, ProfileRepository},
    models::profile::{AdminUpdateProfilePayload, Profile, Role},
};

#[derive(Clone)]
pub struct ProfileService {
    profile_repo: ProfileRepository,
    branch_repo: BranchRepository,
    pool: PgPool,
}

impl ProfileService {
    pub fn new(profile_repo: ProfileRepository, branch_repo: BranchRepository, pool: PgPool) -> Self {
        Self { profile_repo, branch_repo, pool }
    }

    pub async fn update_own_name(&self, profile: &Profile, full_name: &str) -> Result<Profile, AppError> {
        self.profile_repo
            .update_full_name(&self.pool, profile.id, full_name.trim())
            .await
    }

    /// Admin vê todos, gerente vê a própria filial, o resto só a si mesmo.
    pub async fn list_visible(&self, viewer: &Profile) -> Result<Vec<Profile>, AppError> {
        let actor = viewer.actor();
        match (actor.role, actor.branch_id) {
            (Role::Admin, _) => self.profile_repo.list_all(&self.pool).await,
            (Role::Manager, Some(branch)) => self.profile_repo.list_by_branch(&self.pool, branch).await,
            _ => Ok(vec![viewer.clone()]),
        }
    }

    /// Papel e filial só mudam pelas mãos de um admin.
    pub async fn admin_update(
        &self,
        admin: &Profile,
        target_id: Uuid,
        input: &AdminUpdateProfilePayload,
    ) -> Result<Profile, AppError> {
        if !admin.actor().is_admin() {
            return Err(AppError::Forbidden("Só administradores alteram papéis e filiais.".into()));
        }

        if let Some(Some(branch_id)) = input.branch_id {
            self.branch_repo
                .find_by_id(&self.pool, branch_id)
                .await?
                .ok_or_else(|| AppError::InvalidInput(format!("Filial {} não existe.", branch_id)))?;
        }

        let updated = self
            .profile_repo
            .update_role_and_branch(&self.pool, target_id, input.role.map(|r| r.as_str()), input.branch_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Perfil {}", target_id)))?;

        tracing::info!(
            admin_id = %admin.id,
            profile_id = %updated.id,
            role = %updated.role,
            "Perfil alterado pelo admin"
        );
        Ok(updated)
    }
}
