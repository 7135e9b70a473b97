//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod integrations;
mod middleware;
mod models;
mod policy;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, principal_guard};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Formulário público e webhook: sem autenticação
    let public_routes = Router::new()
        .route("/branches", get(handlers::branches::list_public_branches))
        .route("/categories", get(handlers::feedback::list_categories))
        .route("/feedback", post(handlers::feedback::submit_feedback))
        .route("/form-settings", get(handlers::settings::get_form_settings));

    // Só o token: o perfil ainda pode não existir
    let provision_routes = Router::new()
        .route("/provision", post(handlers::auth::provision))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            principal_guard,
        ));

    let app_routes = Router::new()
        // Perfis
        .route("/profiles", get(handlers::profiles::list_profiles))
        .route(
            "/profiles/me",
            get(handlers::profiles::get_me).patch(handlers::profiles::update_me),
        )
        .route("/profiles/{id}", patch(handlers::profiles::admin_update_profile))
        // Filiais e categorias
        .route(
            "/branches",
            get(handlers::branches::list_branches).post(handlers::branches::create_branch),
        )
        .route("/branches/{id}", patch(handlers::branches::update_branch))
        .route("/categories", post(handlers::feedback::create_category))
        // Feedback
        .route("/feedback", get(handlers::feedback::list_feedback))
        .route("/feedback/export", get(handlers::feedback::export_feedback))
        .route(
            "/feedback/{id}",
            get(handlers::feedback::get_feedback).patch(handlers::feedback::update_feedback),
        )
        .route(
            "/feedback/{id}/responses",
            get(handlers::feedback::list_responses).post(handlers::feedback::add_response),
        )
        .route("/feedback/{id}/translate", post(handlers::feedback::translate_feedback))
        // QR codes
        .route(
            "/qr-codes",
            get(handlers::qr_codes::list_qr_codes).post(handlers::qr_codes::create_qr_code),
        )
        .route("/qr-codes/{id}", patch(handlers::qr_codes::update_qr_code))
        .route("/qr-codes/{id}/image", get(handlers::qr_codes::qr_code_image))
        // Equipes e tarefas
        .route(
            "/teams",
            get(handlers::teams::list_teams).post(handlers::teams::create_team),
        )
        .route(
            "/teams/{id}/members",
            get(handlers::teams::list_members).post(handlers::teams::add_member),
        )
        .route("/teams/{id}/members/{profile_id}", delete(handlers::teams::remove_member))
        .route(
            "/teams/{id}/invitations",
            get(handlers::teams::list_invitations).post(handlers::teams::invite),
        )
        .route(
            "/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route("/tasks/{id}", patch(handlers::tasks::update_task))
        // Assinatura
        .route("/billing/subscription", get(handlers::billing::get_subscription))
        .route("/billing/checkout", post(handlers::billing::create_checkout))
        .route("/billing/portal", post(handlers::billing::create_portal))
        // Análises
        .route("/analytics/summary", get(handlers::analytics::get_summary))
        .route("/analytics/insights", post(handlers::analytics::generate_insights))
        // Formulário
        .route("/form-settings", put(handlers::settings::update_form_settings))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let bind_addr = app_state.settings.bind_addr.clone();

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/billing/webhook", post(handlers::billing::stripe_webhook))
        .nest("/api/public", public_routes)
        .nest("/api/auth", provision_routes)
        .nest("/api", app_routes)
        .with_state(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
