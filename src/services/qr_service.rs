// src/services/qr_service.rs

use image::{DynamicImage, ImageOutputFormat, Luma};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, FeedbackRepository, FeedbackScope, QrCodeRepository},
    models::{
        profile::{Profile, Role},
        qr::{CreateQrCodePayload, QrCode, UpdateQrCodePayload},
    },
    policy::{
        access::{branch_access, can_manage_branch},
        subscription::{require, Feature},
    },
    services::subscription_service::SubscriptionService,
};

const QR_MIN_SIZE: u32 = 256;

#[derive(Clone)]
pub struct QrCodeService {
    qr_repo: QrCodeRepository,
    branch_repo: BranchRepository,
    feedback_repo: FeedbackRepository,
    subscriptions: SubscriptionService,
    public_form_base_url: String,
    pool: PgPool,
}

impl QrCodeService {
    pub fn new(
        qr_repo: QrCodeRepository,
        branch_repo: BranchRepository,
        feedback_repo: FeedbackRepository,
        subscriptions: SubscriptionService,
        public_form_base_url: String,
        pool: PgPool,
    ) -> Self {
        Self {
            qr_repo,
            branch_repo,
            feedback_repo,
            subscriptions,
            public_form_base_url,
            pool,
        }
    }

    pub async fn create(&self, owner: &Profile, input: &CreateQrCodePayload) -> Result<QrCode, AppError> {
        if !can_manage_branch(&owner.actor(), input.branch_id) {
            return Err(AppError::Forbidden("Só o admin ou o gerente da filial gera QR codes.".into()));
        }

        // Um QR code sem coleta liberada seria inútil
        let tier = self.subscriptions.current_tier(owner).await?;
        require(tier, Feature::FeedbackCollection, self.subscriptions.basic_ai_quota())?;

        self.branch_repo
            .find_by_id(&self.pool, input.branch_id)
            .await?
            .filter(|b| b.is_active)
            .ok_or_else(|| AppError::InvalidInput("Filial inválida ou inativa.".into()))?;

        if let Some(category_id) = input.category_id {
            self.feedback_repo
                .find_category(&self.pool, category_id)
                .await?
                .ok_or_else(|| AppError::InvalidInput("Categoria inválida.".into()))?;
        }

        let id = Uuid::new_v4();
        let target_url = form_url(&self.public_form_base_url, input.branch_id, input.category_id, id);
        let image_ref = format!("/api/qr-codes/{}/image", id);

        let code = self
            .qr_repo
            .insert(
                &self.pool,
                id,
                owner.id,
                input.branch_id,
                input.category_id,
                input.name.trim(),
                &target_url,
                &image_ref,
            )
            .await?;

        tracing::info!(qr_id = %code.id, branch_id = %code.branch_id, "🔳 QR code criado");
        Ok(code)
    }

    pub async fn list(&self, viewer: &Profile) -> Result<Vec<QrCode>, AppError> {
        let actor = viewer.actor();
        if actor.role == Role::Unrecognized {
            return Ok(Vec::new());
        }
        let codes = self.qr_repo.list_scoped(&self.pool, FeedbackScope::for_actor(&actor)).await?;
        Ok(codes
            .into_iter()
            .filter(|c| branch_access(&actor, c).can_read())
            .collect())
    }

    /// Renomear ou desativar. Não existe exclusão.
    pub async fn update(&self, editor: &Profile, id: Uuid, input: &UpdateQrCodePayload) -> Result<QrCode, AppError> {
        let code = self.load(id).await?;
        if !branch_access(&editor.actor(), &code).can_write_status() {
            return Err(AppError::Forbidden("Sem permissão para alterar este QR code.".into()));
        }
        self.qr_repo
            .update(&self.pool, id, input.name.as_deref().map(str::trim), input.is_active)
            .await
    }

    pub async fn image(&self, viewer: &Profile, id: Uuid) -> Result<Vec<u8>, AppError> {
        let code = self.load(id).await?;
        if !branch_access(&viewer.actor(), &code).can_read() {
            return Err(AppError::Forbidden("Sem acesso a este QR code.".into()));
        }
        render_png(&code.target_url)
    }

    async fn load(&self, id: Uuid) -> Result<QrCode, AppError> {
        self.qr_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QR code {}", id)))
    }
}

pub fn form_url(base: &str, branch_id: Uuid, category_id: Option<Uuid>, qr_id: Uuid) -> String {
    let mut url = format!("{}/feedback?branch={}", base.trim_end_matches('/'), branch_id);
    if let Some(category) = category_id {
        url.push_str(&format!("&category={}", category));
    }
    url.push_str(&format!("&qr={}", qr_id));
    url
}

/// URL -> PNG. Função pura, sem regra de acesso.
pub fn render_png(url: &str) -> Result<Vec<u8>, AppError> {
    let code = qrcode::QrCode::new(url.as_bytes())
        .map_err(|e| anyhow::anyhow!("Falha ao gerar QR code: {:?}", e))?;

    let buffer = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .build();

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(buffer)
        .write_to(&mut bytes, ImageOutputFormat::Png)
        .map_err(|e| anyhow::anyhow!("Falha ao codificar PNG: {}", e))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_png() {
        let png = render_png("https://app.exemplo.com/feedback?branch=1&qr=2").unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn form_url_carries_branch_category_and_qr() {
        let (b, c, q) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let url = form_url("https://app.exemplo.com/", b, Some(c), q);
        assert_eq!(
            url,
            format!("https://app.exemplo.com/feedback?branch={}&category={}&qr={}", b, c, q)
        );
        assert!(!form_url("https://x", b, None, q).contains("category"));
    }
}
