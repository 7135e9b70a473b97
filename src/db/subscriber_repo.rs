// src/db/subscriber_repo.rs
//
// Espelho local do Stripe. Só o refresh e o webhook chamam `apply_state*`.

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::subscription::{Subscriber, SubscriptionState},
};

#[derive(Clone)]
pub struct SubscriberRepository {
    pool: PgPool,
}

impl SubscriberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pelo usuário ou, antes do vínculo, pelo e-mail de cobrança.
    pub async fn find_for_user(&self, user_id: Uuid, email: &str) -> Result<Option<Subscriber>, AppError> {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"
            SELECT * FROM subscribers
            WHERE user_id = $1 OR lower(email) = lower($2)
            ORDER BY (user_id = $1) DESC NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscriber)
    }

    /// Cria a linha de teste no cadastro. Se o e-mail já tinha linha (pagou
    /// antes de criar a conta), só vincula o usuário e preserva o resto.
    pub async fn ensure_trial<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        email: &str,
        trial_end: DateTime<Utc>,
    ) -> Result<Subscriber, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"
            INSERT INTO subscribers (user_id, email, subscribed, trial_end)
            VALUES ($1, $2, FALSE, $3)
            ON CONFLICT (email) DO UPDATE SET
                user_id = COALESCE(subscribers.user_id, EXCLUDED.user_id),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(trial_end)
        .fetch_one(executor)
        .await?;
        Ok(subscriber)
    }

    /// Upsert pelo e-mail (refresh e checkout concluído).
    pub async fn apply_state_for_email<'e, E>(
        &self,
        executor: E,
        email: &str,
        user_id: Option<Uuid>,
        state: &SubscriptionState,
    ) -> Result<Subscriber, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"
            INSERT INTO subscribers (user_id, email, stripe_customer_id, subscribed, subscription_tier, subscription_end)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE SET
                user_id = COALESCE(subscribers.user_id, EXCLUDED.user_id),
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                subscribed = EXCLUDED.subscribed,
                subscription_tier = EXCLUDED.subscription_tier,
                subscription_end = EXCLUDED.subscription_end,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(&state.stripe_customer_id)
        .bind(state.subscribed)
        .bind(state.tier.map(|t| t.as_str()))
        .bind(state.subscription_end)
        .fetch_one(executor)
        .await?;
        Ok(subscriber)
    }

    /// Eventos de assinatura só trazem o cliente do Stripe.
    pub async fn apply_state_for_customer<'e, E>(
        &self,
        executor: E,
        state: &SubscriptionState,
    ) -> Result<Option<Subscriber>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"
            UPDATE subscribers SET
                subscribed = $2,
                subscription_tier = $3,
                subscription_end = $4,
                updated_at = NOW()
            WHERE stripe_customer_id = $1
            RETURNING *
            "#,
        )
        .bind(&state.stripe_customer_id)
        .bind(state.subscribed)
        .bind(state.tier.map(|t| t.as_str()))
        .bind(state.subscription_end)
        .fetch_optional(executor)
        .await?;
        Ok(subscriber)
    }

    /// Sem cliente no Stripe: a assinatura paga deixa de valer, o teste fica.
    pub async fn clear_paid_state<'e, E>(&self, executor: E, subscriber_id: Uuid) -> Result<Subscriber, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"
            UPDATE subscribers SET
                subscribed = FALSE,
                subscription_tier = NULL,
                subscription_end = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(subscriber_id)
        .fetch_one(executor)
        .await?;
        Ok(subscriber)
    }
}
