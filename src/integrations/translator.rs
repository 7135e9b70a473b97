// src/integrations/translator.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{ensure_success, IntegrationError};

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, IntegrationError>;
}

/// API no formato do Google Cloud Translation v2.
pub struct HttpTranslator {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpTranslator {
    pub fn new(client: reqwest::Client, url: String, api_key: String) -> Self {
        Self { client, url, api_key }
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, IntegrationError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "q": text, "target": target_language, "format": "text" }))
            .send()
            .await?;

        let body: TranslateResponse = ensure_success("translate", response).await?.json().await?;

        body.data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| IntegrationError::Decode("translate", "nenhuma tradução".into()))
    }
}

/// Sem chave: a tradução vira no-op (o serviço devolve o texto original).
pub struct DisabledTranslator;

#[async_trait]
impl Translator for DisabledTranslator {
    async fn translate(&self, _text: &str, _target_language: &str) -> Result<String, IntegrationError> {
        Err(IntegrationError::NotConfigured("translate"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_translation_payload() {
        let raw = r#"{"data":{"translations":[{"translatedText":"Hello","detectedSourceLanguage":"pt"}]}}"#;
        let body: TranslateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.data.translations[0].translated_text, "Hello");
    }
}
