// src/models/branch.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::patch::double_option;

// A filial: dona de feedbacks, QR codes e equipes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: Uuid,
    #[schema(example = "Uptown")]
    pub name: String,
    #[schema(example = "Av. Paulista, 1000")]
    pub location: Option<String>,
    pub manager_id: Option<Uuid>,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Versão pública (formulário do cliente)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicBranch {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchPayload {
    #[validate(length(min = 1, max = 100, message = "O nome da filial é obrigatório."))]
    #[schema(example = "Uptown")]
    pub name: String,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBranchPayload {
    #[validate(length(min = 1, max = 100, message = "O nome da filial é obrigatório."))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    // Somente admin: gerente e ativação
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub manager_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

impl UpdateBranchPayload {
    pub fn touches_admin_fields(&self) -> bool {
        self.manager_id.is_some() || self.is_active.is_some()
    }
}
