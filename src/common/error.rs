use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::integrations::IntegrationError;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Conflito: {0}")]
    Conflict(String),

    // Cota mensal de IA esgotada: condição visível ao usuário ("faça upgrade")
    #[error("Cota mensal esgotada ({used}/{limit})")]
    QuotaExceeded { used: i64, limit: i64 },

    #[error("Recurso indisponível no plano atual: {0}")]
    FeatureUnavailable(&'static str),

    #[error("Falha em serviço externo: {0}")]
    ExternalService(#[from] IntegrationError),

    // Estados "impossíveis" (ex: principal sem perfil após o cadastro)
    #[error("Inconsistência de dados: {0}")]
    Integrity(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Converte violação de unicidade em `Conflict`; o resto vira erro de banco.
    pub fn from_unique_violation(e: sqlx::Error, message: impl Into<String>) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::Conflict(message.into());
            }
        }
        e.into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::QuotaExceeded { used, limit } => {
                let body = Json(json!({
                    "error": "Você atingiu a cota mensal de análises de IA. Faça upgrade para continuar.",
                    "code": "upgrade_required",
                    "used": used,
                    "limit": limit,
                }));
                return (StatusCode::PAYMENT_REQUIRED, body).into_response();
            }
            AppError::FeatureUnavailable(feature) => {
                let body = Json(json!({
                    "error": format!("O recurso '{}' não está disponível no seu plano.", feature),
                    "code": "upgrade_required",
                    "feature": feature,
                }));
                return (StatusCode::PAYMENT_REQUIRED, body).into_response();
            }
            AppError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} não encontrado.", what)),
            AppError::Conflict(message) => (StatusCode::CONFLICT, message),
            AppError::ExternalService(ref e) => {
                tracing::warn!("Serviço externo falhou: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "Um serviço externo está indisponível. Tente novamente.".to_string(),
                )
            }

            // Todos os outros erros (Integrity, DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada; o cliente recebe algo genérico.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exceeded_is_payment_required() {
        let response = AppError::QuotaExceeded { used: 10, limit: 10 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn integrity_errors_are_generic_500() {
        let response = AppError::Integrity("perfil ausente".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_maps_to_409() {
        let response = AppError::Conflict("já convidado".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
