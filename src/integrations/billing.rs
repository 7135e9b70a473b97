// src/integrations/billing.rs
//
// Cliente mínimo da API do Stripe (form-encoded) e verificação de webhooks.

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::{ensure_success, IntegrationError};
use crate::models::subscription::{SubscriptionState, Tier};

const STRIPE_API: &str = "https://api.stripe.com/v1";
const SIGNATURE_TOLERANCE_SECS: u64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct PriceIds {
    pub basic: String,
    pub pro: String,
}

impl PriceIds {
    pub fn tier_for_price(&self, price_id: &str) -> Option<Tier> {
        if price_id == self.pro {
            Some(Tier::Pro)
        } else if price_id == self.basic {
            Some(Tier::Basic)
        } else {
            None
        }
    }

    pub fn price_for_tier(&self, tier: Tier) -> Option<&str> {
        match tier {
            Tier::Basic => Some(&self.basic),
            Tier::Pro => Some(&self.pro),
            Tier::None | Tier::Trial => None,
        }
    }
}

#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: Option<String>,
    pub prices: PriceIds,
}

// --- formatos da API ---

#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CustomerObject {
    id: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub customer: String,
    pub status: String,
    pub current_period_end: Option<i64>,
    pub items: List<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: PriceObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceObject {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub customer: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

impl CheckoutSessionObject {
    pub fn email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref().and_then(|d| d.email.as_deref()))
    }
}

impl StripeClient {
    pub fn new(client: reqwest::Client, secret_key: Option<String>, prices: PriceIds) -> Self {
        Self { client, secret_key, prices }
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    fn key(&self) -> Result<&str, IntegrationError> {
        self.secret_key
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("stripe"))
    }

    async fn find_customer_id(&self, email: &str) -> Result<Option<String>, IntegrationError> {
        let response = self
            .client
            .get(format!("{}/customers", STRIPE_API))
            .bearer_auth(self.key()?)
            .query(&[("email", email), ("limit", "1")])
            .send()
            .await?;

        let list: List<CustomerObject> = ensure_success("stripe", response).await?.json().await?;
        Ok(list.data.into_iter().next().map(|c| c.id))
    }

    /// Estado atual da assinatura de um cliente, procurado por e-mail.
    /// `Ok(None)` = o e-mail não tem cliente no Stripe.
    pub async fn find_subscription_state(&self, email: &str) -> Result<Option<SubscriptionState>, IntegrationError> {
        let Some(customer_id) = self.find_customer_id(email).await? else {
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}/subscriptions", STRIPE_API))
            .bearer_auth(self.key()?)
            .query(&[("customer", customer_id.as_str()), ("status", "active"), ("limit", "1")])
            .send()
            .await?;

        let list: List<SubscriptionObject> = ensure_success("stripe", response).await?.json().await?;
        let state = match list.data.first() {
            Some(sub) => self.state_from_subscription(sub),
            None => SubscriptionState {
                stripe_customer_id: customer_id,
                subscribed: false,
                tier: None,
                subscription_end: None,
            },
        };
        Ok(Some(state))
    }

    pub async fn fetch_customer_email(&self, customer_id: &str) -> Result<Option<String>, IntegrationError> {
        let response = self
            .client
            .get(format!("{}/customers/{}", STRIPE_API, customer_id))
            .bearer_auth(self.key()?)
            .send()
            .await?;
        let customer: CustomerObject = ensure_success("stripe", response).await?.json().await?;
        Ok(customer.email)
    }

    pub async fn create_checkout_session(
        &self,
        email: &str,
        customer_id: Option<&str>,
        tier: Tier,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, IntegrationError> {
        let price = self
            .prices
            .price_for_tier(tier)
            .ok_or_else(|| IntegrationError::Decode("stripe", format!("plano sem preço: {}", tier.as_str())))?;

        let mut form: Vec<(&str, &str)> = vec![
            ("mode", "subscription"),
            ("line_items[0][price]", price),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
        ];
        match customer_id {
            Some(id) => form.push(("customer", id)),
            None => form.push(("customer_email", email)),
        }

        let response = self
            .client
            .post(format!("{}/checkout/sessions", STRIPE_API))
            .bearer_auth(self.key()?)
            .form(&form)
            .send()
            .await?;

        let session: SessionObject = ensure_success("stripe", response).await?.json().await?;
        Ok(session.url)
    }

    pub async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String, IntegrationError> {
        let response = self
            .client
            .post(format!("{}/billing_portal/sessions", STRIPE_API))
            .bearer_auth(self.key()?)
            .form(&[("customer", customer_id), ("return_url", return_url)])
            .send()
            .await?;

        let session: SessionObject = ensure_success("stripe", response).await?.json().await?;
        Ok(session.url)
    }

    pub fn state_from_subscription(&self, sub: &SubscriptionObject) -> SubscriptionState {
        let active = matches!(sub.status.as_str(), "active" | "trialing");
        let tier = sub
            .items
            .data
            .first()
            .and_then(|item| self.prices.tier_for_price(&item.price.id));

        SubscriptionState {
            stripe_customer_id: sub.customer.clone(),
            subscribed: active && tier.is_some(),
            tier: if active { tier } else { None },
            subscription_end: sub.current_period_end.and_then(timestamp),
        }
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Valida o cabeçalho `Stripe-Signature` (`t=...,v1=...`) e devolve o evento.
pub fn verify_webhook(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<WebhookEvent, IntegrationError> {
    let mut timestamp_part = None;
    let mut signatures = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp_part = Some(v),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let ts_str = timestamp_part.ok_or(IntegrationError::InvalidSignature)?;
    let ts: i64 = ts_str.parse().map_err(|_| IntegrationError::InvalidSignature)?;
    // `t` vem do remetente: abs_diff não estoura com valores extremos
    if now.timestamp().abs_diff(ts) > SIGNATURE_TOLERANCE_SECS {
        return Err(IntegrationError::InvalidSignature);
    }

    let valid = signatures.iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(ts_str.as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice compara em tempo constante
        mac.verify_slice(&expected).is_ok()
    });

    if !valid {
        return Err(IntegrationError::InvalidSignature);
    }

    serde_json::from_slice(payload).map_err(|e| IntegrationError::Decode("stripe", e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn sign(payload: &str, secret: &str, ts: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", ts, payload).as_bytes());
        format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes()))
    }

    fn client() -> StripeClient {
        StripeClient::new(
            reqwest::Client::new(),
            None,
            PriceIds { basic: "price_basic".into(), pro: "price_pro".into() },
        )
    }

    const EVENT: &str = r#"{"type":"customer.subscription.updated","data":{"object":{"customer":"cus_1","status":"active","current_period_end":1790000000,"items":{"data":[{"price":{"id":"price_pro"}}]}}}}"#;

    #[test]
    fn accepts_valid_signature() {
        let now = Utc::now();
        let header = sign(EVENT, "whsec_x", now.timestamp());
        let event = verify_webhook(EVENT.as_bytes(), &header, "whsec_x", now).unwrap();
        assert_eq!(event.kind, "customer.subscription.updated");
    }

    #[test]
    fn rejects_wrong_secret_and_tampering() {
        let now = Utc::now();
        let header = sign(EVENT, "whsec_x", now.timestamp());
        assert!(verify_webhook(EVENT.as_bytes(), &header, "whsec_y", now).is_err());

        let tampered = EVENT.replace("price_pro", "price_basic");
        assert!(verify_webhook(tampered.as_bytes(), &header, "whsec_x", now).is_err());
        assert!(verify_webhook(EVENT.as_bytes(), "v1=abc", "whsec_x", now).is_err());
    }

    #[test]
    fn rejects_old_timestamp() {
        let now = Utc::now();
        let header = sign(EVENT, "whsec_x", now.timestamp() - 301);
        assert!(matches!(
            verify_webhook(EVENT.as_bytes(), &header, "whsec_x", now),
            Err(IntegrationError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_extreme_timestamps_without_overflow() {
        let now = Utc::now();
        for ts in [i64::MIN, i64::MAX] {
            let header = sign(EVENT, "whsec_x", ts);
            assert!(matches!(
                verify_webhook(EVENT.as_bytes(), &header, "whsec_x", now),
                Err(IntegrationError::InvalidSignature)
            ));
        }
    }

    #[test]
    fn subscription_state_mapping() {
        let stripe = client();
        let event: WebhookEvent = serde_json::from_str(EVENT).unwrap();
        let sub: SubscriptionObject = serde_json::from_value(event.data.object).unwrap();
        let state = stripe.state_from_subscription(&sub);
        assert!(state.subscribed);
        assert_eq!(state.tier, Some(Tier::Pro));
        assert_eq!(state.stripe_customer_id, "cus_1");
        assert!(state.subscription_end.is_some());

        let mut cancelled = sub.clone();
        cancelled.status = "canceled".into();
        let state = stripe.state_from_subscription(&cancelled);
        assert!(!state.subscribed);
        assert_eq!(state.tier, None);

        let mut unknown = sub;
        unknown.items.data[0].price.id = "price_other".into();
        assert!(!stripe.state_from_subscription(&unknown).subscribed);
    }

    #[test]
    fn checkout_session_email_fallback() {
        let raw = r#"{"customer":"cus_1","customer_email":null,"customer_details":{"email":"dono@loja.com"}}"#;
        let session: CheckoutSessionObject = serde_json::from_str(raw).unwrap();
        assert_eq!(session.email(), Some("dono@loja.com"));
    }
}
