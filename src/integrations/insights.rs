// src/integrations/insights.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{ensure_success, IntegrationError};
use crate::models::analytics::{FeedbackDigestEntry, FeedbackSummary, Insight};

#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn analyze(
        &self,
        entries: &[FeedbackDigestEntry],
        summary: &FeedbackSummary,
        question: Option<&str>,
    ) -> Result<Insight, IntegrationError>;
}

/// LLM com API compatível com "chat completions".
pub struct ChatCompletionsInsights {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsInsights {
    pub fn new(client: reqwest::Client, url: String, api_key: String, model: String) -> Self {
        Self { client, url, api_key, model }
    }
}

const SYSTEM_PROMPT: &str = "You analyse customer feedback for a business. \
Answer ONLY with a JSON object with the keys: summary (string), \
sentiment (one of positive, neutral, negative, mixed), keyThemes (array of strings), \
recommendations (array of strings).";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl InsightProvider for ChatCompletionsInsights {
    async fn analyze(
        &self,
        entries: &[FeedbackDigestEntry],
        summary: &FeedbackSummary,
        question: Option<&str>,
    ) -> Result<Insight, IntegrationError> {
        let dataset = json!({
            "statistics": summary,
            "feedback": entries,
            "question": question,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "response_format": { "type": "json_object" },
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": dataset.to_string() },
                ],
            }))
            .send()
            .await?;

        let body: ChatResponse = ensure_success("llm", response).await?.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| IntegrationError::Decode("llm", "resposta vazia".into()))?;

        parse_insight(&content)
    }
}

/// Extrai o JSON do conteúdo (alguns modelos embrulham em ```json).
pub fn parse_insight(content: &str) -> Result<Insight, IntegrationError> {
    let trimmed = content.trim();
    let json_part = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    };
    serde_json::from_str(json_part).map_err(|e| IntegrationError::Decode("llm", e.to_string()))
}

/// Sem chave configurada: o serviço usa o resumo local.
pub struct DisabledInsights;

#[async_trait]
impl InsightProvider for DisabledInsights {
    async fn analyze(
        &self,
        _entries: &[FeedbackDigestEntry],
        _summary: &FeedbackSummary,
        _question: Option<&str>,
    ) -> Result<Insight, IntegrationError> {
        Err(IntegrationError::NotConfigured("llm"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let content = "```json\n{\"summary\":\"ok\",\"sentiment\":\"positive\",\"keyThemes\":[\"rapidez\"],\"recommendations\":[]}\n```";
        let insight = parse_insight(content).unwrap();
        assert_eq!(insight.sentiment, "positive");
        assert_eq!(insight.key_themes, vec!["rapidez".to_string()]);
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_insight("não sei").is_err());
    }
}
