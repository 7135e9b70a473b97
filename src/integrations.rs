// Clientes dos serviços de terceiros. Nenhum deles decide nada sobre acesso:
// os serviços chamam estes clientes depois que as políticas liberaram.
use thiserror::Error;

pub mod billing;
pub mod email;
pub mod insights;
pub mod translator;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("integração não configurada: {0}")]
    NotConfigured(&'static str),

    #[error("erro HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} respondeu {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("resposta inválida de {0}: {1}")]
    Decode(&'static str, String),

    #[error("assinatura de webhook inválida")]
    InvalidSignature,
}

/// Converte respostas não-2xx num erro com o corpo, para log.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}
