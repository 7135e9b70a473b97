// src/services/subscription_service.rs

use chrono::Utc;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{SubscriberRepository, UsageRepository},
    integrations::{
        billing::{verify_webhook, CheckoutSessionObject, StripeClient, SubscriptionObject},
        IntegrationError,
    },
    models::{
        profile::Profile,
        subscription::{Subscriber, SubscriptionState, SubscriptionStatus, Tier},
    },
    policy::subscription::{classify, entitlements, month_start},
};

pub const AI_FEATURE: &str = "ai_analytics";

#[derive(Clone)]
pub struct SubscriptionService {
    subscriber_repo: SubscriberRepository,
    usage_repo: UsageRepository,
    stripe: StripeClient,
    webhook_secret: Option<String>,
    basic_ai_quota: i64,
    app_base_url: String,
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(
        subscriber_repo: SubscriberRepository,
        usage_repo: UsageRepository,
        stripe: StripeClient,
        webhook_secret: Option<String>,
        basic_ai_quota: i64,
        app_base_url: String,
        pool: PgPool,
    ) -> Self {
        Self {
            subscriber_repo,
            usage_repo,
            stripe,
            webhook_secret,
            basic_ai_quota,
            app_base_url,
            pool,
        }
    }

    pub fn basic_ai_quota(&self) -> i64 {
        self.basic_ai_quota
    }

    /// Plano pela cópia local, sem consultar o Stripe (caminho quente dos gates).
    pub async fn current_tier(&self, profile: &Profile) -> Result<Tier, AppError> {
        let subscriber = self.subscriber_repo.find_for_user(profile.id, &profile.email).await?;
        Ok(classify(subscriber.as_ref(), Utc::now()))
    }

    pub async fn ai_calls_this_month(&self, profile: &Profile) -> Result<i64, AppError> {
        self.usage_repo
            .count_since(profile.id, AI_FEATURE, month_start(Utc::now()))
            .await
    }

    /// Registra uma chamada de IA concluída (só depois do sucesso).
    pub async fn record_ai_call(&self, profile: &Profile) -> Result<(), AppError> {
        self.usage_repo.record(&self.pool, profile.id, AI_FEATURE).await
    }

    /// Refresh-on-read: consulta o Stripe e atualiza o espelho. Se o Stripe
    /// falhar (ou não estiver configurado), serve a cópia local com `stale = true`.
    pub async fn status(&self, profile: &Profile) -> Result<SubscriptionStatus, AppError> {
        let cached = self.subscriber_repo.find_for_user(profile.id, &profile.email).await?;

        let fetched = if self.stripe.is_configured() {
            self.stripe.find_subscription_state(&profile.email).await
        } else {
            Err(IntegrationError::NotConfigured("stripe"))
        };

        let (subscriber, stale) = match fetched {
            Ok(state) => (self.mirror(profile, cached, state).await?, false),
            Err(IntegrationError::NotConfigured(_)) => (cached, true),
            Err(e) => {
                tracing::warn!(profile_id = %profile.id, error = %e, "Stripe indisponível, usando cópia local da assinatura");
                (cached, true)
            }
        };

        let now = Utc::now();
        let tier = classify(subscriber.as_ref(), now);
        let used = self.ai_calls_this_month(profile).await?;

        Ok(SubscriptionStatus {
            tier,
            subscribed: subscriber.as_ref().is_some_and(|s| s.subscribed),
            subscription_end: subscriber.as_ref().and_then(|s| s.subscription_end),
            trial_end: subscriber.as_ref().and_then(|s| s.trial_end),
            entitlements: entitlements(tier, self.basic_ai_quota),
            ai_calls_used_this_month: used,
            stale,
        })
    }

    async fn mirror(
        &self,
        profile: &Profile,
        cached: Option<Subscriber>,
        state: Option<SubscriptionState>,
    ) -> Result<Option<Subscriber>, AppError> {
        match (state, cached) {
            (Some(state), _) => self
                .subscriber_repo
                .apply_state_for_email(&self.pool, &profile.email, Some(profile.id), &state)
                .await
                .map(Some),
            // Sem cliente no Stripe: uma assinatura paga local deixa de valer
            (None, Some(sub)) if sub.subscribed => {
                self.subscriber_repo.clear_paid_state(&self.pool, sub.id).await.map(Some)
            }
            (None, cached) => Ok(cached),
        }
    }

    pub async fn create_checkout(&self, profile: &Profile, tier: Tier) -> Result<String, AppError> {
        if !matches!(tier, Tier::Basic | Tier::Pro) {
            return Err(AppError::InvalidInput("Só é possível assinar os planos basic ou pro.".into()));
        }

        let cached = self.subscriber_repo.find_for_user(profile.id, &profile.email).await?;
        let customer_id = cached.as_ref().and_then(|s| s.stripe_customer_id.as_deref());

        let url = self
            .stripe
            .create_checkout_session(
                &profile.email,
                customer_id,
                tier,
                &format!("{}/billing?checkout=success", self.app_base_url),
                &format!("{}/billing?checkout=cancel", self.app_base_url),
            )
            .await?;
        Ok(url)
    }

    pub async fn create_portal(&self, profile: &Profile) -> Result<String, AppError> {
        let cached = self.subscriber_repo.find_for_user(profile.id, &profile.email).await?;
        let customer_id = cached
            .and_then(|s| s.stripe_customer_id)
            .ok_or_else(|| AppError::NotFound("Cliente de cobrança".into()))?;

        let url = self
            .stripe
            .create_portal_session(&customer_id, &format!("{}/billing", self.app_base_url))
            .await?;
        Ok(url)
    }

    /// Único caminho (além do refresh) que grava plano no espelho.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<(), AppError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("stripe webhook"))?;

        let event = verify_webhook(payload, signature, secret, Utc::now()).map_err(|e| match e {
            IntegrationError::InvalidSignature => AppError::InvalidInput("Assinatura do webhook inválida.".into()),
            other => other.into(),
        })?;

        match event.kind.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = serde_json::from_value(event.data.object)
                    .map_err(|e| IntegrationError::Decode("stripe", e.to_string()))?;
                let email = match (session.email(), session.customer.as_deref()) {
                    (Some(email), _) => Some(email.to_string()),
                    (None, Some(customer)) => self.stripe.fetch_customer_email(customer).await?,
                    (None, None) => None,
                };
                if let Some(email) = email {
                    if let Some(state) = self.stripe.find_subscription_state(&email).await? {
                        self.subscriber_repo
                            .apply_state_for_email(&self.pool, &email, None, &state)
                            .await?;
                        tracing::info!(email = %email, tier = ?state.tier, "💳 Checkout aplicado");
                    }
                }
            }
            "customer.subscription.created" | "customer.subscription.updated" | "customer.subscription.deleted" => {
                let sub: SubscriptionObject = serde_json::from_value(event.data.object)
                    .map_err(|e| IntegrationError::Decode("stripe", e.to_string()))?;
                let mut state = self.stripe.state_from_subscription(&sub);
                if event.kind == "customer.subscription.deleted" {
                    state.subscribed = false;
                    state.tier = None;
                }

                let updated = self.subscriber_repo.apply_state_for_customer(&self.pool, &state).await?;
                if updated.is_none() {
                    // Cliente ainda não espelhado: procura o e-mail no Stripe
                    if let Some(email) = self.stripe.fetch_customer_email(&sub.customer).await? {
                        self.subscriber_repo
                            .apply_state_for_email(&self.pool, &email, None, &state)
                            .await?;
                    }
                }
                tracing::info!(kind = %event.kind, customer = %sub.customer, "💳 Evento de assinatura aplicado");
            }
            other => {
                tracing::debug!(kind = %other, "Evento do Stripe ignorado");
            }
        }

        Ok(())
    }
}
