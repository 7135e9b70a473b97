// src/services/analytics_service.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{FeedbackRepository, FeedbackScope},
    integrations::insights::InsightProvider,
    models::{
        analytics::{FeedbackDigestEntry, FeedbackSummary, Insight, InsightRequest, InsightResponse, InsightSource, SummaryQuery},
        feedback::{FeedbackFilter, FeedbackView},
        profile::{Profile, Role},
    },
    policy::{redaction::project_all, subscription::check_ai_quota},
    services::subscription_service::SubscriptionService,
};

const DEFAULT_WINDOW_DAYS: i64 = 30;
const MAX_ROWS: i64 = 500;
// Quantas linhas vão para o LLM
const DIGEST_SIZE: usize = 100;

#[derive(Clone)]
pub struct AnalyticsService {
    feedback_repo: FeedbackRepository,
    subscriptions: SubscriptionService,
    provider: Arc<dyn InsightProvider>,
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(
        feedback_repo: FeedbackRepository,
        subscriptions: SubscriptionService,
        provider: Arc<dyn InsightProvider>,
        pool: PgPool,
    ) -> Self {
        Self { feedback_repo, subscriptions, provider, pool }
    }

    async fn visible(&self, viewer: &Profile, branch_id: Option<uuid::Uuid>, days: Option<i64>) -> Result<Vec<FeedbackView>, AppError> {
        let actor = viewer.actor();
        if actor.role == Role::Unrecognized {
            return Ok(Vec::new());
        }
        let since = Utc::now() - Duration::days(days.unwrap_or(DEFAULT_WINDOW_DAYS));
        let filter = FeedbackFilter {
            branch_id,
            limit: Some(MAX_ROWS),
            ..Default::default()
        };
        let rows = self
            .feedback_repo
            .list_scoped(&self.pool, FeedbackScope::for_actor(&actor), &filter, Some(since))
            .await?;
        Ok(project_all(&actor, rows))
    }

    /// Estatísticas locais, sem gate de plano.
    pub async fn summary(&self, viewer: &Profile, query: &SummaryQuery) -> Result<FeedbackSummary, AppError> {
        let days = query.days.map(|d| d.clamp(1, 365));
        let views = self.visible(viewer, query.branch_id, days).await?;
        Ok(summarize(&views))
    }

    /// Verifica a cota, chama o LLM e só registra o uso se ele respondeu.
    ///
    /// A verificação e o registro não são atômicos: duas requisições simultâneas
    /// com a contagem em `limite - 1` passam as duas.
    pub async fn insights(&self, viewer: &Profile, request: &InsightRequest) -> Result<InsightResponse, AppError> {
        let tier = self.subscriptions.current_tier(viewer).await?;
        let used = self.subscriptions.ai_calls_this_month(viewer).await?;
        let limit = check_ai_quota(tier, used, self.subscriptions.basic_ai_quota())?;

        let views = self.visible(viewer, request.branch_id, request.days).await?;
        let summary = summarize(&views);
        let entries = digest(&views, DIGEST_SIZE);

        let (insight, source) = run_insight(self.provider.as_ref(), &entries, &summary, request.question.as_deref()).await;

        let mut ai_calls_used = used;
        if source == InsightSource::Llm {
            self.subscriptions.record_ai_call(viewer).await?;
            ai_calls_used += 1;
        }

        Ok(InsightResponse {
            insight,
            source,
            summary,
            ai_calls_used,
            ai_calls_limit: limit,
        })
    }
}

/// Falha do LLM cai no resumo local; nunca vira erro para o usuário.
pub async fn run_insight(
    provider: &dyn InsightProvider,
    entries: &[FeedbackDigestEntry],
    summary: &FeedbackSummary,
    question: Option<&str>,
) -> (Insight, InsightSource) {
    if entries.is_empty() {
        return (fallback_insight(summary), InsightSource::Fallback);
    }
    match provider.analyze(entries, summary, question).await {
        Ok(insight) => (insight, InsightSource::Llm),
        Err(e) => {
            tracing::warn!(error = %e, "Análise por IA indisponível, usando resumo local");
            (fallback_insight(summary), InsightSource::Fallback)
        }
    }
}

pub fn summarize(views: &[FeedbackView]) -> FeedbackSummary {
    let mut rating_distribution: BTreeMap<String, i64> = (1..=5).map(|r| (r.to_string(), 0)).collect();
    let mut by_status = BTreeMap::new();
    let mut by_priority = BTreeMap::new();
    let mut rating_sum = 0i64;

    for v in views {
        *rating_distribution.entry(v.rating.to_string()).or_insert(0) += 1;
        *by_status.entry(label(&v.status)).or_insert(0) += 1;
        *by_priority.entry(label(&v.priority)).or_insert(0) += 1;
        rating_sum += i64::from(v.rating);
    }

    let total = views.len() as i64;
    let average_rating = (total > 0).then(|| {
        let avg = rating_sum as f64 / total as f64;
        (avg * 100.0).round() / 100.0
    });

    FeedbackSummary {
        total,
        average_rating,
        rating_distribution,
        by_status,
        by_priority,
    }
}

/// Amostra sem dados pessoais do cliente.
pub fn digest(views: &[FeedbackView], max: usize) -> Vec<FeedbackDigestEntry> {
    views
        .iter()
        .take(max)
        .map(|v| FeedbackDigestEntry {
            rating: v.rating,
            subject: v.subject.clone(),
            message: v.message.clone(),
            status: label(&v.status),
            priority: label(&v.priority),
        })
        .collect()
}

pub fn fallback_insight(summary: &FeedbackSummary) -> Insight {
    let Some(avg) = summary.average_rating else {
        return Insight {
            summary: "Nenhum feedback no período.".into(),
            sentiment: "neutral".into(),
            key_themes: Vec::new(),
            recommendations: vec!["Divulgue o QR code para começar a coletar feedback.".into()],
        };
    };

    let sentiment = if avg >= 4.0 {
        "positive"
    } else if avg <= 2.5 {
        "negative"
    } else {
        "mixed"
    };

    let low = count(&summary.rating_distribution, "1") + count(&summary.rating_distribution, "2");
    let pending = count(&summary.by_status, "pending");
    let urgent = count(&summary.by_priority, "urgent") + count(&summary.by_priority, "high");

    let mut key_themes = Vec::new();
    if low > 0 {
        key_themes.push(format!("{} avaliações baixas (1-2)", low));
    }
    if urgent > 0 {
        key_themes.push(format!("{} itens de prioridade alta ou urgente", urgent));
    }

    let mut recommendations = Vec::new();
    if pending > 0 {
        recommendations.push(format!("Triar os {} feedbacks pendentes.", pending));
    }
    if low > 0 {
        recommendations.push("Responder primeiro aos clientes com nota baixa.".into());
    }
    if recommendations.is_empty() {
        recommendations.push("Manter o acompanhamento semanal.".into());
    }

    Insight {
        summary: format!("{} feedbacks, nota média {:.2}.", summary.total, avg),
        sentiment: sentiment.into(),
        key_themes,
        recommendations,
    }
}

fn count(map: &BTreeMap<String, i64>, key: &str) -> i64 {
    map.get(key).copied().unwrap_or(0)
}

// Mesmo texto do JSON ("in_progress", "urgent", ...)
fn label<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::IntegrationError;
    use crate::models::feedback::{FeedbackStatus, Priority};
    use crate::policy::access::tests::feedback;
    use crate::policy::redaction::{apply, Projection};
    use async_trait::async_trait;

    struct FailingProvider;

    #[async_trait]
    impl InsightProvider for FailingProvider {
        async fn analyze(
            &self,
            _entries: &[FeedbackDigestEntry],
            _summary: &FeedbackSummary,
            _question: Option<&str>,
        ) -> Result<Insight, IntegrationError> {
            Err(IntegrationError::Status { service: "llm", status: 500, body: "boom".into() })
        }
    }

    struct FixedProvider;

    #[async_trait]
    impl InsightProvider for FixedProvider {
        async fn analyze(
            &self,
            entries: &[FeedbackDigestEntry],
            _summary: &FeedbackSummary,
            _question: Option<&str>,
        ) -> Result<Insight, IntegrationError> {
            Ok(Insight {
                summary: format!("{} itens", entries.len()),
                sentiment: "negative".into(),
                key_themes: vec!["demora".into()],
                recommendations: vec![],
            })
        }
    }

    fn views() -> Vec<FeedbackView> {
        let mut a = feedback(None, None);
        a.rating = 1;
        a.priority = Priority::Urgent;
        let mut b = feedback(None, None);
        b.rating = 4;
        b.status = FeedbackStatus::Resolved;
        vec![apply(Projection::Full, a), apply(Projection::Full, b)]
    }

    #[test]
    fn summary_counts() {
        let s = summarize(&views());
        assert_eq!(s.total, 2);
        assert_eq!(s.average_rating, Some(2.5));
        assert_eq!(s.rating_distribution["1"], 1);
        assert_eq!(s.rating_distribution["3"], 0);
        assert_eq!(s.by_status["pending"], 1);
        assert_eq!(s.by_status["resolved"], 1);
        assert_eq!(s.by_priority["urgent"], 1);
    }

    #[test]
    fn digest_carries_no_customer_data() {
        let entries = digest(&views(), 10);
        let json = serde_json::to_string(&entries).unwrap();
        assert!(!json.contains("a@b.com"));
        assert!(!json.contains("Ana"));
        assert_eq!(entries[0].status, "pending");
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_local_summary() {
        let v = views();
        let s = summarize(&v);
        let (insight, source) = run_insight(&FailingProvider, &digest(&v, 10), &s, None).await;
        assert_eq!(source, InsightSource::Fallback);
        assert_eq!(insight.sentiment, "mixed");
        assert!(!insight.recommendations.is_empty());
    }

    #[tokio::test]
    async fn llm_success_is_marked() {
        let v = views();
        let s = summarize(&v);
        let (insight, source) = run_insight(&FixedProvider, &digest(&v, 10), &s, Some("o que melhorar?")).await;
        assert_eq!(source, InsightSource::Llm);
        assert_eq!(insight.summary, "2 itens");
    }

    #[tokio::test]
    async fn empty_window_skips_the_llm() {
        let s = summarize(&[]);
        let (insight, source) = run_insight(&FixedProvider, &[], &s, None).await;
        assert_eq!(source, InsightSource::Fallback);
        assert_eq!(insight.sentiment, "neutral");
    }
}
