// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Public ---
        handlers::branches::list_public_branches,
        handlers::feedback::list_categories,
        handlers::feedback::submit_feedback,
        handlers::settings::get_form_settings,

        // --- Auth ---
        handlers::auth::provision,

        // --- Profiles ---
        handlers::profiles::get_me,
        handlers::profiles::update_me,
        handlers::profiles::list_profiles,
        handlers::profiles::admin_update_profile,

        // --- Branches ---
        handlers::branches::list_branches,
        handlers::branches::create_branch,
        handlers::branches::update_branch,

        // --- Feedback ---
        handlers::feedback::create_category,
        handlers::feedback::list_feedback,
        handlers::feedback::get_feedback,
        handlers::feedback::update_feedback,
        handlers::feedback::list_responses,
        handlers::feedback::add_response,
        handlers::feedback::export_feedback,
        handlers::feedback::translate_feedback,

        // --- QR Codes ---
        handlers::qr_codes::create_qr_code,
        handlers::qr_codes::list_qr_codes,
        handlers::qr_codes::update_qr_code,
        handlers::qr_codes::qr_code_image,

        // --- Teams / Tasks ---
        handlers::teams::create_team,
        handlers::teams::list_teams,
        handlers::teams::list_members,
        handlers::teams::add_member,
        handlers::teams::remove_member,
        handlers::teams::invite,
        handlers::teams::list_invitations,
        handlers::tasks::create_task,
        handlers::tasks::list_tasks,
        handlers::tasks::update_task,

        // --- Billing ---
        handlers::billing::get_subscription,
        handlers::billing::create_checkout,
        handlers::billing::create_portal,
        handlers::billing::stripe_webhook,

        // --- Analytics ---
        handlers::analytics::get_summary,
        handlers::analytics::generate_insights,

        // --- Settings ---
        handlers::settings::update_form_settings,
    ),
    components(
        schemas(
            // --- Profiles ---
            models::profile::Role,
            models::profile::Profile,
            models::profile::UpdateOwnProfilePayload,
            models::profile::AdminUpdateProfilePayload,
            models::profile::ProvisionPayload,
            models::profile::ProvisionedProfile,

            // --- Branches ---
            models::branch::Branch,
            models::branch::PublicBranch,
            models::branch::CreateBranchPayload,
            models::branch::UpdateBranchPayload,

            // --- Feedback ---
            models::feedback::FeedbackStatus,
            models::feedback::Priority,
            models::feedback::FeedbackCategory,
            models::feedback::CreateCategoryPayload,
            models::feedback::FeedbackView,
            models::feedback::FeedbackResponse,
            models::feedback::CreateResponsePayload,
            models::feedback::SubmitFeedbackPayload,
            models::feedback::FeedbackReceipt,
            models::feedback::UpdateFeedbackPayload,
            models::feedback::TranslateFeedbackPayload,
            models::feedback::TranslatedFeedback,

            // --- QR Codes ---
            models::qr::QrCode,
            models::qr::CreateQrCodePayload,
            models::qr::UpdateQrCodePayload,

            // --- Teams ---
            models::team::Team,
            models::team::TeamMember,
            models::team::CreateTeamPayload,
            models::team::AddMemberPayload,
            models::team::InvitationStatus,
            models::team::TeamInvitation,
            models::team::InvitePayload,
            models::team::InviteOutcome,
            models::team::TaskStatus,
            models::team::Task,
            models::team::CreateTaskPayload,
            models::team::UpdateTaskPayload,

            // --- Billing ---
            models::subscription::Tier,
            models::subscription::Entitlements,
            models::subscription::SubscriptionStatus,
            models::subscription::CheckoutPayload,
            models::subscription::SessionUrl,

            // --- Analytics ---
            models::analytics::FeedbackSummary,
            models::analytics::Insight,
            models::analytics::InsightSource,
            models::analytics::InsightRequest,
            models::analytics::InsightResponse,

            // --- Settings ---
            models::settings::FeedbackFormSettings,
            models::settings::UpdateFormSettingsRequest,
        )
    ),
    tags(
        (name = "Public", description = "Formulário público (sem login)"),
        (name = "Auth", description = "Provisionamento do perfil após o cadastro"),
        (name = "Profiles", description = "Perfis, papéis e filiais"),
        (name = "Branches", description = "Gestão de Filiais"),
        (name = "Feedback", description = "Triagem, respostas, exportação e tradução"),
        (name = "QR Codes", description = "QR codes que levam ao formulário"),
        (name = "Teams", description = "Equipes, membros e convites"),
        (name = "Tasks", description = "Tarefas delegadas"),
        (name = "Billing", description = "Assinatura e Stripe"),
        (name = "Analytics", description = "Estatísticas e análise por IA"),
        (name = "Settings", description = "Configuração do formulário")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/public/feedback",
            "/api/auth/provision",
            "/api/feedback/{id}/translate",
            "/api/teams/{id}/invitations",
            "/api/billing/webhook",
            "/api/analytics/insights",
            "/api/form-settings",
        ] {
            assert!(doc.paths.paths.contains_key(path), "rota sem documentação: {}", path);
        }
    }
}
