// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

/// Idioma preferido do cliente (`Accept-Language`), só a parte primária:
/// "pt-BR" vira "pt". Sem cabeçalho, "en".
pub struct Locale(pub String);

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_str| {
                accept_language::parse(header_str)
                    .first()
                    .map(|tag| primary_subtag(tag))
            })
            .unwrap_or_else(|| "en".to_string());

        Ok(Locale(lang))
    }
}

fn primary_subtag(tag: &str) -> String {
    tag.split('-').next().unwrap_or(tag).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn locale_for(header: Option<&str>) -> String {
        let mut builder = Request::builder();
        if let Some(value) = header {
            builder = builder.header(header::ACCEPT_LANGUAGE, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        let Ok(Locale(lang)) = Locale::from_request_parts(&mut parts, &()).await;
        lang
    }

    #[tokio::test]
    async fn picks_highest_weighted_primary_subtag() {
        assert_eq!(locale_for(Some("pt-BR,pt;q=0.9,en;q=0.8")).await, "pt");
        assert_eq!(locale_for(Some("en;q=0.5, es-MX")).await, "es");
    }

    #[tokio::test]
    async fn defaults_to_english() {
        assert_eq!(locale_for(None).await, "en");
    }
}
