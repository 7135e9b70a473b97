// src/models/subscription.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Espelho local do provedor de cobrança. Somente o webhook e o refresh gravam aqui.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    pub subscribed: bool,
    #[schema(example = "basic")]
    pub subscription_tier: Option<String>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    None,
    Trial,
    Basic,
    Pro,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::None => "none",
            Tier::Trial => "trial",
            Tier::Basic => "basic",
            Tier::Pro => "pro",
        }
    }
}

/// Recursos liberados por um plano. `None` em limites significa ilimitado.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entitlements {
    pub feedback_collection: bool,
    pub max_branches: Option<i64>,
    pub ai_calls_per_month: Option<i64>,
    pub data_export: bool,
    pub translation: bool,
}

/// O que a mudança de estado vinda do Stripe grava no espelho.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionState {
    pub stripe_customer_id: String,
    pub subscribed: bool,
    pub tier: Option<Tier>,
    pub subscription_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub tier: Tier,
    pub subscribed: bool,
    pub subscription_end: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub entitlements: Entitlements,
    pub ai_calls_used_this_month: i64,
    // true quando o Stripe não respondeu e servimos a cópia local
    pub stale: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[schema(example = "pro")]
    pub tier: Tier,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionUrl {
    pub url: String,
}
