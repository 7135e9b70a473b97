// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Personalização do formulário público, por filial (ou padrão, sem filial).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackFormSettings {
    pub branch_id: Option<Uuid>,

    #[schema(example = "Conte-nos como foi sua experiência")]
    pub title: String,

    pub description: Option<String>,

    #[schema(example = "#000000")]
    pub primary_color: Option<String>,

    #[schema(example = "https://minhaloja.com/assets/logo.png")]
    pub logo_url: Option<String>,

    #[schema(example = "Obrigado pelo seu feedback!")]
    pub thank_you_message: Option<String>,

    pub require_category: bool,
    pub collect_contact: bool,

    pub updated_at: Option<DateTime<Utc>>,
}

impl FeedbackFormSettings {
    pub fn builtin(branch_id: Option<Uuid>) -> Self {
        Self {
            branch_id,
            title: "Conte-nos como foi sua experiência".to_string(),
            description: None,
            primary_color: None,
            logo_url: None,
            thank_you_message: Some("Obrigado pelo seu feedback!".to_string()),
            require_category: false,
            collect_contact: true,
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormSettingsRequest {
    // Ausente = configuração padrão (somente admin)
    pub branch_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[validate(length(max = 20))]
    pub primary_color: Option<String>,

    #[validate(url)]
    pub logo_url: Option<String>,

    #[validate(length(max = 500))]
    pub thank_you_message: Option<String>,

    #[serde(default)]
    pub require_category: bool,

    #[serde(default = "default_true")]
    pub collect_contact: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FormSettingsQuery {
    pub branch_id: Option<Uuid>,
}
