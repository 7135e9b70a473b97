// src/models/analytics.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Estatísticas calculadas localmente (sem IA)
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub total: i64,
    pub average_rating: Option<f64>,
    // "1".."5" -> quantidade
    pub rating_distribution: BTreeMap<String, i64>,
    pub by_status: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
}

/// Resultado estruturado de uma análise (IA ou fallback local).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub summary: String,
    #[schema(example = "negative")]
    pub sentiment: String,
    #[serde(default)]
    pub key_themes: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
    Llm,
    Fallback,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsightResponse {
    pub insight: Insight,
    pub source: InsightSource,
    pub summary: FeedbackSummary,
    pub ai_calls_used: i64,
    pub ai_calls_limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    pub branch_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub question: Option<String>,
    #[validate(range(min = 1, max = 365))]
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub branch_id: Option<Uuid>,
    // Janela em dias (padrão 30)
    pub days: Option<i64>,
}

/// Amostra de feedback enviada ao LLM (sem dados pessoais do cliente).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDigestEntry {
    pub rating: i32,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub priority: String,
}
