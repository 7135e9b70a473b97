// src/integrations/email.rs

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ensure_success, IntegrationError};

/// Um e-mail transacional: destinatário, assunto e dados do template.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub template: &'static str,
    pub data: Value,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError>;
}

/// Envio via API do Resend.
pub struct ResendEmailSender {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendEmailSender {
    pub fn new(client: reqwest::Client, api_key: String, from: String) -> Self {
        Self { client, api_key, from }
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError> {
        let response = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [message.to],
                "subject": message.subject,
                "html": render_html(message),
            }))
            .send()
            .await?;

        ensure_success("resend", response).await?;
        Ok(())
    }
}

/// Sem chave configurada: só registra no log.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            template = message.template,
            "📧 E-mail não enviado (provedor não configurado)"
        );
        Ok(())
    }
}

// O conteúdo dos templates fica com o front/marketing; aqui só listamos os dados.
fn render_html(message: &EmailMessage) -> String {
    let mut html = format!("<h2>{}</h2>", escape(&message.subject));
    if let Some(fields) = message.data.as_object() {
        html.push_str("<ul>");
        for (key, value) in fields {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            html.push_str(&format!("<li><b>{}</b>: {}</li>", escape(key), escape(&text)));
        }
        html.push_str("</ul>");
    }
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Guarda tudo o que seria enviado.
    pub struct MockEmailSender {
        pub sent: Arc<Mutex<Vec<EmailMessage>>>,
        pub fail: bool,
    }

    impl MockEmailSender {
        pub fn new(fail: bool) -> (Self, Arc<Mutex<Vec<EmailMessage>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            (Self { sent: sent.clone(), fail }, sent)
        }
    }

    #[async_trait]
    impl EmailSender for MockEmailSender {
        async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError> {
            if self.fail {
                return Err(IntegrationError::NotConfigured("mock"));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[test]
    fn html_escapes_user_content() {
        let message = EmailMessage {
            to: "a@b.com".into(),
            subject: "Convite".into(),
            template: "team_invitation",
            data: json!({ "team": "<script>" }),
        };
        let html = render_html(&message);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn log_sender_never_fails() {
        let message = EmailMessage {
            to: "a@b.com".into(),
            subject: "x".into(),
            template: "t",
            data: Value::Null,
        };
        assert!(LogEmailSender.send(&message).await.is_ok());
    }
}
