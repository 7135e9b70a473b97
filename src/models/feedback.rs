// src/models/feedback.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::patch::double_option;

// --- ENUMS ---

// Mapeia o CREATE TYPE feedback_status do banco
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "feedback_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Pending,
    InProgress,
    Resolved,
    Closed,
}

// Mapeia o CREATE TYPE feedback_priority (reusado pelas tarefas)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default, ToSchema)]
#[sqlx(type_name = "feedback_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

// --- CATEGORIAS (globais, sem filial) ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackCategory {
    pub id: Uuid,
    #[schema(example = "Atendimento")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "#3B82F6")]
    pub color: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "required"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 20))]
    pub color: Option<String>,
}

// --- FEEDBACK (a linha completa, nunca serializada diretamente) ---

#[derive(Debug, Clone, FromRow)]
pub struct Feedback {
    pub id: Uuid,
    pub branch_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub rating: i32,
    pub subject: String,
    pub message: String,
    pub status: FeedbackStatus,
    pub priority: Priority,
    pub is_anonymous: bool,
    pub assigned_to: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Projeção de um feedback entregue ao cliente da API.
/// `redacted = true` significa que os dados pessoais do cliente foram mascarados.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    pub id: Uuid,
    pub branch_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    #[schema(example = 4)]
    pub rating: i32,
    pub subject: String,
    pub message: String,
    pub status: FeedbackStatus,
    pub priority: Priority,
    pub is_anonymous: bool,
    pub assigned_to: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub redacted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

// --- RESPOSTAS (append-only) ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub id: Uuid,
    pub feedback_id: Uuid,
    pub author_id: Uuid,
    pub message: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponsePayload {
    #[validate(length(min = 1, max = 2000, message = "A resposta deve ter entre 1 e 2000 caracteres."))]
    pub message: String,
    #[serde(default)]
    pub is_internal: bool,
}

// =============================================================================
//  CAMINHO PÚBLICO (envio anônimo)
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackPayload {
    pub branch_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub qr_code_id: Option<Uuid>,

    #[validate(range(min = 1, max = 5, message = "A nota deve estar entre 1 e 5."))]
    #[schema(example = 2)]
    pub rating: i32,

    #[validate(length(min = 1, max = 200, message = "O assunto deve ter entre 1 e 200 caracteres."))]
    #[schema(example = "Demora no atendimento")]
    pub subject: String,

    #[validate(length(min = 1, max = 2000, message = "A mensagem deve ter entre 1 e 2000 caracteres."))]
    pub message: String,

    pub priority: Option<Priority>,

    #[validate(length(max = 100, message = "O nome deve ter no máximo 100 caracteres."))]
    pub customer_name: Option<String>,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "a@b.com")]
    pub customer_email: Option<String>,

    #[validate(length(max = 20, message = "O telefone deve ter no máximo 20 caracteres."))]
    pub customer_phone: Option<String>,
}

impl SubmitFeedbackPayload {
    /// Remove espaços e transforma textos opcionais vazios em `None`,
    /// antes da validação.
    pub fn normalized(mut self) -> Self {
        self.subject = self.subject.trim().to_string();
        self.message = self.message.trim().to_string();
        self.customer_name = non_blank(self.customer_name);
        self.customer_email = non_blank(self.customer_email);
        self.customer_phone = non_blank(self.customer_phone);
        self
    }

    /// Anônimo se, e somente se, nenhum nome foi informado.
    pub fn is_anonymous(&self) -> bool {
        self.customer_name.is_none()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// O que o repositório grava. Sempre nasce `pending`, sem responsável.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub branch_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub rating: i32,
    pub subject: String,
    pub message: String,
    pub priority: Priority,
    pub is_anonymous: bool,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

/// Resposta do envio público: nada além do necessário para a tela de agradecimento.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReceipt {
    pub id: Uuid,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
    pub thank_you_message: Option<String>,
}

// =============================================================================
//  TRIAGEM
// =============================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeedbackPayload {
    pub status: Option<FeedbackStatus>,
    // `null` remove o responsável
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to: Option<Option<Uuid>>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
}

impl UpdateFeedbackPayload {
    /// Campos que exigem acesso total (não basta ser o responsável).
    pub fn touches_full_access_fields(&self) -> bool {
        self.priority.is_some() || self.category_id.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.assigned_to.is_none()
            && self.priority.is_none()
            && self.category_id.is_none()
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FeedbackFilter {
    pub status: Option<FeedbackStatus>,
    pub branch_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateFeedbackPayload {
    #[validate(length(min = 2, max = 10))]
    #[schema(example = "en")]
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedFeedback {
    pub feedback_id: Uuid,
    pub target_language: String,
    pub subject: String,
    pub message: String,
    pub translated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(rating: i32) -> SubmitFeedbackPayload {
        SubmitFeedbackPayload {
            branch_id: None,
            category_id: None,
            qr_code_id: None,
            rating,
            subject: "Atendimento".into(),
            message: "Fui bem atendido".into(),
            priority: None,
            customer_name: None,
            customer_email: None,
            customer_phone: None,
        }
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(payload(0).validate().is_err());
        assert!(payload(6).validate().is_err());
        assert!(payload(1).validate().is_ok());
        assert!(payload(5).validate().is_ok());
    }

    #[test]
    fn blank_subject_is_rejected_after_normalization() {
        let mut p = payload(3);
        p.subject = "   ".into();
        let errors = p.normalized().validate().unwrap_err();
        assert!(errors.field_errors().contains_key("subject"));
    }

    #[test]
    fn message_length_limit() {
        let mut p = payload(3);
        p.message = "x".repeat(2001);
        assert!(p.validate().is_err());
        let mut p = payload(3);
        p.message = "x".repeat(2000);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn contact_fields_are_checked() {
        let mut p = payload(3);
        p.customer_email = Some("not-an-email".into());
        assert!(p.validate().is_err());

        let mut p = payload(3);
        p.customer_phone = Some("1".repeat(21));
        assert!(p.validate().is_err());

        let mut p = payload(3);
        p.customer_name = Some("n".repeat(101));
        assert!(p.validate().is_err());
    }

    #[test]
    fn anonymity_is_derived_from_name() {
        let mut p = payload(4);
        p.customer_name = Some("   ".into());
        let p = p.normalized();
        assert!(p.is_anonymous());
        assert_eq!(p.customer_name, None);

        let mut p = payload(4);
        p.customer_name = Some(" Ana ".into());
        let p = p.normalized();
        assert!(!p.is_anonymous());
        assert_eq!(p.customer_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn client_supplied_anonymity_flag_is_ignored() {
        let json = r#"{"rating":5,"subject":"a","message":"b","customerName":"Ana","isAnonymous":true}"#;
        let p: SubmitFeedbackPayload = serde_json::from_str(json).unwrap();
        assert!(!p.normalized().is_anonymous());
    }
}
