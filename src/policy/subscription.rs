// src/policy/subscription.rs
//
// Gate de assinatura: independente do papel, decide quais recursos o plano libera.

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::common::error::AppError;
use crate::models::subscription::{Entitlements, Subscriber, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    FeedbackCollection,
    AiAnalytics,
    DataExport,
    Translation,
}

impl Feature {
    pub fn label(&self) -> &'static str {
        match self {
            Feature::FeedbackCollection => "feedback_collection",
            Feature::AiAnalytics => "ai_analytics",
            Feature::DataExport => "data_export",
            Feature::Translation => "translation",
        }
    }
}

/// Classifica o espelho local. Um plano pago vencido ou desconhecido cai para
/// o teste (se ainda válido) e depois para `None`.
pub fn classify(subscriber: Option<&Subscriber>, now: DateTime<Utc>) -> Tier {
    let Some(sub) = subscriber else {
        return Tier::None;
    };

    let paid_active = sub.subscribed && sub.subscription_end.is_none_or(|end| end > now);
    if paid_active {
        match sub.subscription_tier.as_deref() {
            Some("pro") => return Tier::Pro,
            Some("basic") => return Tier::Basic,
            _ => {}
        }
    }

    match sub.trial_end {
        Some(end) if end > now => Tier::Trial,
        _ => Tier::None,
    }
}

pub fn entitlements(tier: Tier, basic_ai_quota: i64) -> Entitlements {
    match tier {
        Tier::None => Entitlements {
            feedback_collection: false,
            max_branches: Some(0),
            ai_calls_per_month: Some(0),
            data_export: false,
            translation: false,
        },
        Tier::Trial => Entitlements {
            feedback_collection: true,
            max_branches: Some(1),
            ai_calls_per_month: Some(0),
            data_export: false,
            translation: true,
        },
        Tier::Basic => Entitlements {
            feedback_collection: true,
            max_branches: None,
            ai_calls_per_month: Some(basic_ai_quota),
            data_export: false,
            translation: false,
        },
        Tier::Pro => Entitlements {
            feedback_collection: true,
            max_branches: None,
            ai_calls_per_month: None,
            data_export: true,
            translation: true,
        },
    }
}

pub fn allows(tier: Tier, feature: Feature, basic_ai_quota: i64) -> bool {
    let e = entitlements(tier, basic_ai_quota);
    match feature {
        Feature::FeedbackCollection => e.feedback_collection,
        Feature::DataExport => e.data_export,
        Feature::Translation => e.translation,
        Feature::AiAnalytics => e.ai_calls_per_month.is_none_or(|limit| limit > 0),
    }
}

pub fn require(tier: Tier, feature: Feature, basic_ai_quota: i64) -> Result<(), AppError> {
    if allows(tier, feature, basic_ai_quota) {
        Ok(())
    } else {
        Err(AppError::FeatureUnavailable(feature.label()))
    }
}

/// Pode criar mais uma filial? `existing` não conta a filial padrão.
pub fn check_branch_limit(tier: Tier, existing: i64) -> Result<(), AppError> {
    match entitlements(tier, 0).max_branches {
        Some(max) if existing >= max => Err(AppError::FeatureUnavailable("branches")),
        _ => Ok(()),
    }
}

/// Verificação da cota de IA *antes* da chamada paga. Retorna o limite vigente
/// (`None` = ilimitado).
///
/// Não é atômica com o registro do uso: duas requisições simultâneas podem ler
/// a mesma contagem e ambas passar, consumindo uma chamada além da cota.
pub fn check_ai_quota(tier: Tier, used_this_month: i64, basic_ai_quota: i64) -> Result<Option<i64>, AppError> {
    require(tier, Feature::AiAnalytics, basic_ai_quota)?;
    match entitlements(tier, basic_ai_quota).ai_calls_per_month {
        None => Ok(None),
        Some(limit) if used_this_month >= limit => Err(AppError::QuotaExceeded {
            used: used_this_month,
            limit,
        }),
        Some(limit) => Ok(Some(limit)),
    }
}

/// Início do mês-calendário corrente (UTC), base da contagem de uso.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn subscriber(subscribed: bool, tier: Option<&str>, end: Option<DateTime<Utc>>, trial: Option<DateTime<Utc>>) -> Subscriber {
        Subscriber {
            id: Uuid::new_v4(),
            user_id: None,
            email: "dono@loja.com".into(),
            stripe_customer_id: None,
            subscribed,
            subscription_tier: tier.map(str::to_string),
            subscription_end: end,
            trial_end: trial,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn classification() {
        let now = Utc::now();
        let later = Some(now + Duration::days(10));
        let earlier = Some(now - Duration::days(1));

        assert_eq!(classify(None, now), Tier::None);
        assert_eq!(classify(Some(&subscriber(true, Some("pro"), later, None)), now), Tier::Pro);
        assert_eq!(classify(Some(&subscriber(true, Some("basic"), None, None)), now), Tier::Basic);
        assert_eq!(classify(Some(&subscriber(false, None, None, later)), now), Tier::Trial);
        assert_eq!(classify(Some(&subscriber(false, None, None, earlier)), now), Tier::None);
        // pago vencido cai para o teste
        assert_eq!(classify(Some(&subscriber(true, Some("pro"), earlier, later)), now), Tier::Trial);
        // plano desconhecido não libera nada
        assert_eq!(classify(Some(&subscriber(true, Some("gold"), later, None)), now), Tier::None);
    }

    #[test]
    fn gating_table() {
        use Feature::*;
        let q = 10;
        assert!(!allows(Tier::None, FeedbackCollection, q));
        assert!(allows(Tier::Trial, FeedbackCollection, q));

        assert!(!allows(Tier::Trial, AiAnalytics, q));
        assert!(allows(Tier::Basic, AiAnalytics, q));
        assert!(allows(Tier::Pro, AiAnalytics, q));

        assert!(!allows(Tier::Basic, DataExport, q));
        assert!(allows(Tier::Pro, DataExport, q));

        assert!(allows(Tier::Trial, Translation, q));
        assert!(!allows(Tier::Basic, Translation, q));
        assert!(allows(Tier::Pro, Translation, q));
    }

    #[test]
    fn branch_limits() {
        assert!(check_branch_limit(Tier::None, 0).is_err());
        assert!(check_branch_limit(Tier::Trial, 0).is_ok());
        assert!(check_branch_limit(Tier::Trial, 1).is_err());
        assert!(check_branch_limit(Tier::Basic, 50).is_ok());
    }

    #[test]
    fn basic_quota_is_exhausted_at_limit() {
        assert_eq!(check_ai_quota(Tier::Basic, 9, 10).unwrap(), Some(10));
        match check_ai_quota(Tier::Basic, 10, 10) {
            Err(AppError::QuotaExceeded { used, limit }) => assert_eq!((used, limit), (10, 10)),
            other => panic!("esperava QuotaExceeded, veio {:?}", other),
        }
        assert_eq!(check_ai_quota(Tier::Pro, 10_000, 10).unwrap(), None);
        assert!(matches!(check_ai_quota(Tier::Trial, 0, 10), Err(AppError::FeatureUnavailable(_))));
    }

    // Comportamento documentado: sem guarda transacional, duas requisições que
    // leem a mesma contagem (9 de 10) passam as duas, e a décima primeira
    // chamada acontece. A próxima, com a contagem já em 11, é barrada.
    #[test]
    fn concurrent_checks_may_overspend_one_unit() {
        let used_seen_by_both = 9;
        assert!(check_ai_quota(Tier::Basic, used_seen_by_both, 10).is_ok());
        assert!(check_ai_quota(Tier::Basic, used_seen_by_both, 10).is_ok());

        let used_after_both = used_seen_by_both + 2;
        assert!(matches!(
            check_ai_quota(Tier::Basic, used_after_both, 10),
            Err(AppError::QuotaExceeded { .. })
        ));
    }

    #[test]
    fn month_start_is_first_day_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 30, 0).unwrap();
        assert_eq!(month_start(now), Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap());
    }
}
