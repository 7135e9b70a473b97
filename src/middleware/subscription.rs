// src/middleware/subscription.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    models::profile::Profile,
    policy::subscription::{require, Feature},
};

/// Um recurso liberado por plano.
pub trait FeatureDef: Send + Sync + 'static {
    fn feature() -> Feature;
}

/// Guardião de rota: barra com 402 quando o plano do usuário não inclui `T`.
/// Precisa rodar depois do `auth_guard`.
pub struct RequireFeature<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireFeature<T>
where
    T: FeatureDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let profile = parts
            .extensions
            .get::<Profile>()
            .ok_or(AppError::InvalidToken)?;

        let subscriptions = &app_state.subscription_service;
        let tier = subscriptions.current_tier(profile).await?;
        require(tier, T::feature(), subscriptions.basic_ai_quota())?;

        Ok(RequireFeature(PhantomData))
    }
}

// ---
// RECURSOS (TIPOS)
// ---

pub struct DataExport;
impl FeatureDef for DataExport {
    fn feature() -> Feature { Feature::DataExport }
}

pub struct Translation;
impl FeatureDef for Translation {
    fn feature() -> Feature { Feature::Translation }
}
