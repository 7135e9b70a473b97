// src/services/notifications.rs
//
// E-mails disparados depois de uma escrita. Falhas nunca desfazem a escrita:
// viram avisos na resposta.

use serde_json::json;

use crate::{
    common::response::WithWarnings,
    integrations::email::{EmailMessage, EmailSender},
};

pub async fn deliver<T>(sender: &dyn EmailSender, message: EmailMessage, result: &mut WithWarnings<T>) {
    if let Err(e) = sender.send(&message).await {
        tracing::warn!(template = message.template, error = %e, "Falha ao enviar e-mail");
        result.warn(format!("Não foi possível enviar o e-mail para {}.", message.to));
    }
}

pub fn feedback_assigned(to: &str, feedback_subject: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Um feedback foi atribuído a você".into(),
        template: "feedback_assigned",
        data: json!({ "feedback": feedback_subject, "link": link }),
    }
}

pub fn feedback_reply(to: &str, feedback_subject: &str, reply: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Resposta ao seu feedback: {}", feedback_subject),
        template: "feedback_reply",
        data: json!({ "feedback": feedback_subject, "reply": reply }),
    }
}

pub fn team_invitation(to: &str, team_name: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Convite para a equipe {}", team_name),
        template: "team_invitation",
        data: json!({ "team": team_name, "link": link }),
    }
}

pub fn task_assigned(to: &str, task_title: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Nova tarefa atribuída a você".into(),
        template: "task_assigned",
        data: json!({ "task": task_title, "link": link }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::email::tests::MockEmailSender;

    #[tokio::test]
    async fn failed_delivery_becomes_a_warning() {
        let (sender, sent) = MockEmailSender::new(true);
        let mut result = WithWarnings::new(42);

        deliver(&sender, team_invitation("novo@loja.com", "Salão", "https://x"), &mut result).await;

        assert_eq!(result.data, 42);
        assert_eq!(result.warnings.len(), 1);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_delivery_adds_no_warning() {
        let (sender, sent) = MockEmailSender::new(false);
        let mut result = WithWarnings::new(());

        deliver(&sender, task_assigned("s@loja.com", "Ligar para cliente", "https://x"), &mut result).await;

        assert!(result.warnings.is_empty());
        assert_eq!(sent.lock().unwrap()[0].template, "task_assigned");
    }
}
