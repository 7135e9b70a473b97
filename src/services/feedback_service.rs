// src/services/feedback_service.rs

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    common::{error::AppError, response::WithWarnings},
    db::{BranchRepository, FeedbackRepository, FeedbackScope, ProfileRepository, QrCodeRepository, SettingsRepository},
    integrations::{email::EmailSender, translator::Translator},
    models::{
        feedback::{
            CreateCategoryPayload, CreateResponsePayload, Feedback, FeedbackCategory, FeedbackFilter,
            FeedbackReceipt, FeedbackResponse, FeedbackStatus, FeedbackView, NewFeedback, SubmitFeedbackPayload,
            TranslatedFeedback, UpdateFeedbackPayload,
        },
        profile::{Profile, Role},
    },
    policy::{
        access::{assignee_fits_branch, branch_access, Access},
        redaction::{apply, project, project_all, projection_for, Projection},
        subscription::{require, Feature},
    },
    services::{notifications, subscription_service::SubscriptionService},
};

const EXPORT_LIMIT: i64 = 10_000;

#[derive(Clone)]
pub struct FeedbackService {
    feedback_repo: FeedbackRepository,
    branch_repo: BranchRepository,
    profile_repo: ProfileRepository,
    qr_repo: QrCodeRepository,
    settings_repo: SettingsRepository,
    subscriptions: SubscriptionService,
    email: Arc<dyn EmailSender>,
    translator: Arc<dyn Translator>,
    app_base_url: String,
    pool: PgPool,
}

impl FeedbackService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feedback_repo: FeedbackRepository,
        branch_repo: BranchRepository,
        profile_repo: ProfileRepository,
        qr_repo: QrCodeRepository,
        settings_repo: SettingsRepository,
        subscriptions: SubscriptionService,
        email: Arc<dyn EmailSender>,
        translator: Arc<dyn Translator>,
        app_base_url: String,
        pool: PgPool,
    ) -> Self {
        Self {
            feedback_repo,
            branch_repo,
            profile_repo,
            qr_repo,
            settings_repo,
            subscriptions,
            email,
            translator,
            app_base_url,
            pool,
        }
    }

    // =========================================================================
    //  CATEGORIAS
    // =========================================================================

    pub async fn list_categories(&self) -> Result<Vec<FeedbackCategory>, AppError> {
        self.feedback_repo.list_active_categories().await
    }

    pub async fn create_category(&self, creator: &Profile, input: &CreateCategoryPayload) -> Result<FeedbackCategory, AppError> {
        if !creator.actor().is_admin() {
            return Err(AppError::Forbidden("Só administradores criam categorias.".into()));
        }
        self.feedback_repo
            .create_category(&self.pool, input.name.trim(), input.description.as_deref(), input.color.as_deref())
            .await
    }

    // =========================================================================
    //  ENVIO PÚBLICO (sem principal)
    // =========================================================================

    pub async fn submit(&self, payload: SubmitFeedbackPayload) -> Result<FeedbackReceipt, AppError> {
        let payload = payload.normalized();
        payload.validate()?;

        let mut branch_id = payload.branch_id;
        let mut category_id = payload.category_id;

        // QR code: precisa estar ativo e o plano do dono precisa liberar a coleta
        if let Some(qr_id) = payload.qr_code_id {
            let qr = self
                .qr_repo
                .find_by_id(qr_id)
                .await?
                .filter(|q| q.is_active)
                .ok_or_else(|| AppError::InvalidInput("QR code inválido ou desativado.".into()))?;

            if branch_id.is_some_and(|b| b != qr.branch_id) {
                return Err(AppError::InvalidInput("A filial não corresponde ao QR code.".into()));
            }
            branch_id = Some(qr.branch_id);
            category_id = category_id.or(qr.category_id);

            let owner = self
                .profile_repo
                .find_by_id(qr.owner_id)
                .await?
                .ok_or_else(|| AppError::Integrity(format!("QR code {} sem dono", qr.id)))?;
            let tier = self.subscriptions.current_tier(&owner).await?;
            require(tier, Feature::FeedbackCollection, self.subscriptions.basic_ai_quota())?;
        }

        if let Some(id) = branch_id {
            self.branch_repo
                .find_by_id(&self.pool, id)
                .await?
                .filter(|b| b.is_active)
                .ok_or_else(|| AppError::InvalidInput("Filial inválida ou inativa.".into()))?;
        }

        if let Some(id) = category_id {
            self.feedback_repo
                .find_category(&self.pool, id)
                .await?
                .filter(|c| c.is_active)
                .ok_or_else(|| AppError::InvalidInput("Categoria inválida.".into()))?;
        }

        let settings = self.settings_repo.resolve(branch_id).await?;
        if settings.require_category && category_id.is_none() {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("required");
            err.message = Some("Escolha uma categoria.".into());
            errors.add("categoryId", err);
            return Err(AppError::ValidationError(errors));
        }

        let is_anonymous = payload.is_anonymous();
        let new_feedback = NewFeedback {
            branch_id,
            category_id,
            rating: payload.rating,
            subject: payload.subject,
            message: payload.message,
            priority: payload.priority.unwrap_or_default(),
            is_anonymous,
            customer_name: payload.customer_name,
            customer_email: payload.customer_email,
            customer_phone: payload.customer_phone,
        };

        let mut tx = self.pool.begin().await?;
        let row = self.feedback_repo.insert(&mut *tx, &new_feedback).await?;
        if let Some(qr_id) = payload.qr_code_id {
            self.qr_repo.increment_scan(&mut *tx, qr_id).await?;
        }
        tx.commit().await?;

        tracing::info!(feedback_id = %row.id, branch_id = ?row.branch_id, rating = row.rating, "📝 Feedback recebido");

        Ok(FeedbackReceipt {
            id: row.id,
            status: row.status,
            created_at: row.created_at,
            thank_you_message: settings.thank_you_message,
        })
    }

    // =========================================================================
    //  LEITURA (sempre pela projeção)
    // =========================================================================

    pub async fn list(&self, viewer: &Profile, filter: &FeedbackFilter) -> Result<Vec<FeedbackView>, AppError> {
        let actor = viewer.actor();
        if actor.role == Role::Unrecognized {
            return Ok(Vec::new());
        }
        let rows = self
            .feedback_repo
            .list_scoped(&self.pool, FeedbackScope::for_actor(&actor), filter, None)
            .await?;
        Ok(project_all(&actor, rows))
    }

    pub async fn get(&self, viewer: &Profile, id: Uuid) -> Result<FeedbackView, AppError> {
        let row = self.load(id).await?;
        project(&viewer.actor(), row).ok_or_else(denied)
    }

    /// Exportação JSON de tudo o que o usuário pode ver. O gate do plano
    /// fica na rota (`RequireFeature<DataExport>`).
    pub async fn export(&self, viewer: &Profile) -> Result<Vec<FeedbackView>, AppError> {
        let filter = FeedbackFilter {
            limit: Some(EXPORT_LIMIT),
            ..Default::default()
        };
        let actor = viewer.actor();
        if actor.role == Role::Unrecognized {
            return Ok(Vec::new());
        }
        let rows = self
            .feedback_repo
            .list_export(&self.pool, FeedbackScope::for_actor(&actor), &filter)
            .await?;

        tracing::info!(profile_id = %viewer.id, rows = rows.len(), "📤 Exportação de feedback");
        Ok(project_all(&actor, rows))
    }

    // =========================================================================
    //  TRIAGEM
    // =========================================================================

    pub async fn update(
        &self,
        editor: &Profile,
        id: Uuid,
        input: &UpdateFeedbackPayload,
    ) -> Result<WithWarnings<FeedbackView>, AppError> {
        if input.is_empty() {
            return Err(AppError::InvalidInput("Nada para alterar.".into()));
        }

        let actor = editor.actor();
        let row = self.load(id).await?;
        let access = branch_access(&actor, &row);
        check_triage_access(access, input)?;

        let mut assignee_to_notify = None;
        if let Some(Some(assignee_id)) = input.assigned_to {
            let assignee = self
                .profile_repo
                .find_by_id(assignee_id)
                .await?
                .ok_or_else(|| AppError::InvalidInput(format!("Perfil {} não existe.", assignee_id)))?;
            validate_assignee(&assignee, row.branch_id)?;
            if row.assigned_to != Some(assignee_id) && assignee_id != editor.id {
                assignee_to_notify = Some(assignee);
            }
        }

        if let Some(Some(category_id)) = input.category_id {
            self.feedback_repo
                .find_category(&self.pool, category_id)
                .await?
                .ok_or_else(|| AppError::InvalidInput("Categoria inválida.".into()))?;
        }

        let status = input.status.unwrap_or(row.status);
        let resolved_at = match status {
            FeedbackStatus::Resolved | FeedbackStatus::Closed => row.resolved_at.or_else(|| {
                (status == FeedbackStatus::Resolved).then(Utc::now)
            }),
            _ => None,
        };

        let updated = self
            .feedback_repo
            .update_triage(
                &self.pool,
                id,
                status,
                input.priority.unwrap_or(row.priority),
                input.assigned_to.unwrap_or(row.assigned_to),
                input.category_id.unwrap_or(row.category_id),
                resolved_at,
            )
            .await?;

        tracing::info!(feedback_id = %id, editor = %editor.id, status = ?updated.status, "Feedback atualizado");

        let subject = updated.subject.clone();
        let mut result = WithWarnings::new(view_after_write(&actor, updated));

        if let Some(assignee) = assignee_to_notify {
            let link = format!("{}/feedback/{}", self.app_base_url, id);
            notifications::deliver(
                self.email.as_ref(),
                notifications::feedback_assigned(&assignee.email, &subject, &link),
                &mut result,
            )
            .await;
        }

        Ok(result)
    }

    // =========================================================================
    //  RESPOSTAS
    // =========================================================================

    pub async fn list_responses(&self, viewer: &Profile, feedback_id: Uuid) -> Result<Vec<FeedbackResponse>, AppError> {
        let row = self.load(feedback_id).await?;
        if !branch_access(&viewer.actor(), &row).can_read() {
            return Err(denied());
        }
        self.feedback_repo.list_responses(&self.pool, feedback_id).await
    }

    /// Só quem tem acesso total ou é responsável responde. Respostas públicas
    /// vão por e-mail ao cliente, se ele deixou um.
    pub async fn add_response(
        &self,
        author: &Profile,
        feedback_id: Uuid,
        input: &CreateResponsePayload,
    ) -> Result<WithWarnings<FeedbackResponse>, AppError> {
        let row = self.load(feedback_id).await?;
        let actor = author.actor();
        if !branch_access(&actor, &row).can_write_status() {
            return Err(AppError::Forbidden("Só o responsável ou o gerente da filial pode responder.".into()));
        }

        let message = input.message.trim();
        let response = self
            .feedback_repo
            .insert_response(&self.pool, feedback_id, author.id, message, input.is_internal)
            .await?;

        let mut result = WithWarnings::new(response);
        let sees_contact = projection_for(&actor, &row) == Some(Projection::Full);
        if !input.is_internal && sees_contact {
            if let Some(customer_email) = row.customer_email.as_deref() {
                notifications::deliver(
                    self.email.as_ref(),
                    notifications::feedback_reply(customer_email, &row.subject, message),
                    &mut result,
                )
                .await;
            }
        }

        Ok(result)
    }

    // =========================================================================
    //  TRADUÇÃO
    // =========================================================================

    /// Falha na tradução devolve o texto original com `translated = false`.
    pub async fn translate(&self, viewer: &Profile, id: Uuid, target_language: &str) -> Result<TranslatedFeedback, AppError> {
        let view = self.get(viewer, id).await?;
        Ok(translate_view(self.translator.as_ref(), view, target_language).await)
    }

    async fn load(&self, id: Uuid) -> Result<Feedback, AppError> {
        self.feedback_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Feedback {}", id)))
    }
}

fn denied() -> AppError {
    AppError::Forbidden("Sem acesso a este feedback.".into())
}

/// Prioridade e categoria exigem acesso total; status e atribuição aceitam o responsável.
fn check_triage_access(access: Access, input: &UpdateFeedbackPayload) -> Result<(), AppError> {
    if !access.can_write_status() {
        return Err(denied());
    }
    if input.touches_full_access_fields() && !access.can_write() {
        return Err(AppError::Forbidden(
            "O responsável só pode alterar status e atribuição.".into(),
        ));
    }
    Ok(())
}

/// Responsáveis precisam ser equipe e estar na filial da linha (admins valem em qualquer filial).
fn validate_assignee(assignee: &Profile, row_branch: Option<Uuid>) -> Result<(), AppError> {
    let actor = assignee.actor();
    if !matches!(actor.role, Role::Admin | Role::Manager | Role::Staff) {
        return Err(AppError::InvalidInput("O responsável precisa ser da equipe.".into()));
    }
    if !actor.is_admin() && !assignee_fits_branch(actor.branch_id, row_branch) {
        return Err(AppError::InvalidInput("O responsável precisa pertencer à filial do feedback.".into()));
    }
    Ok(())
}

/// Depois de uma escrita o editor pode ter perdido o acesso (ex: tirou a própria
/// atribuição); nesse caso devolve a projeção mascarada.
fn view_after_write(actor: &crate::models::profile::Actor, row: Feedback) -> FeedbackView {
    let projection = projection_for(actor, &row).unwrap_or(Projection::Redacted);
    apply(projection, row)
}

async fn translate_view(translator: &dyn Translator, view: FeedbackView, target_language: &str) -> TranslatedFeedback {
    let subject = translator.translate(&view.subject, target_language).await;
    let message = translator.translate(&view.message, target_language).await;

    match (subject, message) {
        (Ok(subject), Ok(message)) => TranslatedFeedback {
            feedback_id: view.id,
            target_language: target_language.to_string(),
            subject,
            message,
            translated: true,
        },
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(feedback_id = %view.id, error = %e, "Tradução indisponível, devolvendo original");
            TranslatedFeedback {
                feedback_id: view.id,
                target_language: target_language.to_string(),
                subject: view.subject,
                message: view.message,
                translated: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::IntegrationError;
    use crate::models::feedback::Priority;
    use crate::policy::access::tests::{actor, feedback};
    use async_trait::async_trait;

    struct Upper;

    #[async_trait]
    impl Translator for Upper {
        async fn translate(&self, text: &str, _target: &str) -> Result<String, IntegrationError> {
            Ok(text.to_uppercase())
        }
    }

    struct Broken;

    #[async_trait]
    impl Translator for Broken {
        async fn translate(&self, _text: &str, _target: &str) -> Result<String, IntegrationError> {
            Err(IntegrationError::NotConfigured("translate"))
        }
    }

    fn profile(role: &str, branch: Option<Uuid>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "p@loja.com".into(),
            full_name: None,
            role: role.into(),
            branch_id: branch,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn translation_failure_returns_original_text() {
        let view = apply(Projection::Full, feedback(None, None));
        let out = translate_view(&Broken, view, "en").await;
        assert!(!out.translated);
        assert_eq!(out.subject, "Demora");
    }

    #[tokio::test]
    async fn translation_success() {
        let view = apply(Projection::Full, feedback(None, None));
        let out = translate_view(&Upper, view, "en").await;
        assert!(out.translated);
        assert_eq!(out.subject, "DEMORA");
    }

    #[test]
    fn assignee_may_change_status_but_not_priority() {
        let status_only = UpdateFeedbackPayload {
            status: Some(FeedbackStatus::InProgress),
            ..Default::default()
        };
        let with_priority = UpdateFeedbackPayload {
            priority: Some(Priority::Urgent),
            ..Default::default()
        };

        assert!(check_triage_access(Access::Assigned, &status_only).is_ok());
        assert!(matches!(
            check_triage_access(Access::Assigned, &with_priority),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_triage_access(Access::Full, &with_priority).is_ok());
        assert!(check_triage_access(Access::Redacted, &status_only).is_err());
    }

    #[test]
    fn assignees_must_be_staff_of_the_row_branch() {
        let a = Uuid::new_v4();
        assert!(validate_assignee(&profile("staff", Some(a)), Some(a)).is_ok());
        assert!(validate_assignee(&profile("staff", Some(Uuid::new_v4())), Some(a)).is_err());
        assert!(validate_assignee(&profile("user", Some(a)), Some(a)).is_err());
        assert!(validate_assignee(&profile("admin", None), Some(a)).is_ok());
    }

    #[test]
    fn editor_who_unassigns_themselves_gets_redacted_view() {
        let a = Uuid::new_v4();
        let staff = actor(Role::Staff, Some(a));
        let view = view_after_write(&staff, feedback(Some(a), None));
        assert!(view.redacted);
        assert_eq!(view.customer_email, None);
    }
}
