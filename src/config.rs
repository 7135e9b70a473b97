// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        BranchRepository, FeedbackRepository, ProfileRepository, QrCodeRepository, SettingsRepository,
        SubscriberRepository, TaskRepository, TeamRepository, UsageRepository,
    },
    integrations::{
        billing::{PriceIds, StripeClient},
        email::{EmailSender, LogEmailSender, ResendEmailSender},
        insights::{ChatCompletionsInsights, DisabledInsights, InsightProvider},
        translator::{DisabledTranslator, HttpTranslator, Translator},
    },
    services::{
        analytics_service::AnalyticsService, auth::AuthService, branch_service::BranchService,
        feedback_service::FeedbackService, profile_service::ProfileService, qr_service::QrCodeService,
        settings_service::SettingsService, subscription_service::SubscriptionService,
        task_service::TaskService, team_service::TeamService,
    },
};

/// Variáveis de ambiente, lidas uma vez na inicialização.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub public_form_base_url: String,
    pub app_base_url: String,
    pub trial_days: i64,
    pub ai_monthly_quota_basic: i64,
    pub invitation_ttl_days: i64,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_price_basic: String,
    pub stripe_price_pro: String,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub translate_api_key: Option<String>,
    pub translate_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_api_url: String,
    pub llm_model: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_base_url = var_or("APP_BASE_URL", "http://localhost:5173");

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000"),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            jwt_audience: var_or("JWT_AUDIENCE", "authenticated"),
            public_form_base_url: var_or("PUBLIC_FORM_BASE_URL", &app_base_url),
            app_base_url,
            trial_days: parse_or("TRIAL_DAYS", 14)?,
            ai_monthly_quota_basic: parse_or("AI_MONTHLY_QUOTA_BASIC", 10)?,
            invitation_ttl_days: parse_or("INVITATION_TTL_DAYS", 7)?,
            stripe_secret_key: optional("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            stripe_price_basic: var_or("STRIPE_PRICE_BASIC", ""),
            stripe_price_pro: var_or("STRIPE_PRICE_PRO", ""),
            resend_api_key: optional("RESEND_API_KEY"),
            email_from: var_or("EMAIL_FROM", "Feedback Hub <no-reply@feedbackhub.app>"),
            translate_api_key: optional("TRANSLATE_API_KEY"),
            translate_api_url: var_or(
                "TRANSLATE_API_URL",
                "https://translation.googleapis.com/language/translate/v2",
            ),
            llm_api_key: optional("LLM_API_KEY"),
            llm_api_url: var_or("LLM_API_URL", "https://api.openai.com/v1/chat/completions"),
            llm_model: var_or("LLM_MODEL", "gpt-4o-mini"),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw.parse().with_context(|| format!("{} inválida: {}", key, raw)),
        None => Ok(default),
    }
}

// O estado compartilhado por todos os handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub auth_service: AuthService,
    pub profile_service: ProfileService,
    pub branch_service: BranchService,
    pub feedback_service: FeedbackService,
    pub qr_service: QrCodeService,
    pub settings_service: SettingsService,
    pub team_service: TeamService,
    pub task_service: TaskService,
    pub subscription_service: SubscriptionService,
    pub analytics_service: AnalyticsService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Settings::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::build(settings, db_pool, reqwest::Client::new()))
    }

    // --- Monta o gráfico de dependências ---
    fn build(settings: Settings, db_pool: PgPool, http: reqwest::Client) -> Self {
        let profile_repo = ProfileRepository::new(db_pool.clone());
        let branch_repo = BranchRepository::new(db_pool.clone());
        let feedback_repo = FeedbackRepository::new(db_pool.clone());
        let qr_repo = QrCodeRepository::new(db_pool.clone());
        let team_repo = TeamRepository::new(db_pool.clone());
        let task_repo = TaskRepository::new(db_pool.clone());
        let subscriber_repo = SubscriberRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());
        let usage_repo = UsageRepository::new(db_pool.clone());

        // Integrações: sem chave, cai na versão degradada
        let email: Arc<dyn EmailSender> = match &settings.resend_api_key {
            Some(key) => Arc::new(ResendEmailSender::new(http.clone(), key.clone(), settings.email_from.clone())),
            None => {
                tracing::warn!("RESEND_API_KEY ausente: e-mails serão apenas registrados no log");
                Arc::new(LogEmailSender)
            }
        };
        let translator: Arc<dyn Translator> = match &settings.translate_api_key {
            Some(key) => Arc::new(HttpTranslator::new(http.clone(), settings.translate_api_url.clone(), key.clone())),
            None => Arc::new(DisabledTranslator),
        };
        let insights: Arc<dyn InsightProvider> = match &settings.llm_api_key {
            Some(key) => Arc::new(ChatCompletionsInsights::new(
                http.clone(),
                settings.llm_api_url.clone(),
                key.clone(),
                settings.llm_model.clone(),
            )),
            None => Arc::new(DisabledInsights),
        };
        let stripe = StripeClient::new(
            http,
            settings.stripe_secret_key.clone(),
            PriceIds {
                basic: settings.stripe_price_basic.clone(),
                pro: settings.stripe_price_pro.clone(),
            },
        );

        let subscription_service = SubscriptionService::new(
            subscriber_repo.clone(),
            usage_repo,
            stripe,
            settings.stripe_webhook_secret.clone(),
            settings.ai_monthly_quota_basic,
            settings.app_base_url.clone(),
            db_pool.clone(),
        );
        let auth_service = AuthService::new(
            profile_repo.clone(),
            branch_repo.clone(),
            subscriber_repo,
            team_repo.clone(),
            settings.jwt_secret.clone(),
            settings.jwt_audience.clone(),
            settings.trial_days,
            db_pool.clone(),
        );
        let profile_service = ProfileService::new(profile_repo.clone(), branch_repo.clone(), db_pool.clone());
        let branch_service = BranchService::new(
            branch_repo.clone(),
            profile_repo.clone(),
            subscription_service.clone(),
            db_pool.clone(),
        );
        let feedback_service = FeedbackService::new(
            feedback_repo.clone(),
            branch_repo.clone(),
            profile_repo.clone(),
            qr_repo.clone(),
            settings_repo.clone(),
            subscription_service.clone(),
            email.clone(),
            translator,
            settings.app_base_url.clone(),
            db_pool.clone(),
        );
        let qr_service = QrCodeService::new(
            qr_repo,
            branch_repo.clone(),
            feedback_repo.clone(),
            subscription_service.clone(),
            settings.public_form_base_url.clone(),
            db_pool.clone(),
        );
        let settings_service = SettingsService::new(settings_repo, branch_repo.clone(), db_pool.clone());
        let team_service = TeamService::new(
            team_repo.clone(),
            profile_repo.clone(),
            branch_repo,
            email.clone(),
            settings.app_base_url.clone(),
            settings.invitation_ttl_days,
            db_pool.clone(),
        );
        let task_service = TaskService::new(
            task_repo,
            team_repo,
            profile_repo,
            email,
            settings.app_base_url.clone(),
            db_pool.clone(),
        );
        let analytics_service = AnalyticsService::new(
            feedback_repo,
            subscription_service.clone(),
            insights,
            db_pool.clone(),
        );

        Self {
            db_pool,
            settings: Arc::new(settings),
            auth_service,
            profile_service,
            branch_service,
            feedback_service,
            qr_service,
            settings_service,
            team_service,
            task_service,
            subscription_service,
            analytics_service,
        }
    }
}
