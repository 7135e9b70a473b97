// src/models/qr.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// QR code de uma filial. Nunca é apagado: só desativado.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub branch_id: Uuid,
    pub category_id: Option<Uuid>,
    #[schema(example = "Mesa 12")]
    pub name: String,
    #[schema(example = "https://app.exemplo.com/feedback?branch=...&qr=...")]
    pub target_url: String,
    #[schema(example = "/api/qr-codes/550e8400-e29b-41d4-a716-446655440000/image")]
    pub image_ref: String,
    pub scan_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQrCodePayload {
    pub branch_id: Uuid,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100, message = "O nome do QR code é obrigatório."))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQrCodePayload {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
}
