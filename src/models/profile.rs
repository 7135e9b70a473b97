// src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::patch::double_option;

// ---
// 1. Papel (Role)
// ---
// Guardado como TEXT no banco. Qualquer valor desconhecido vira `Unrecognized`,
// que não tem privilégio nenhum (falha fechada).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Staff,
    User,
    #[serde(skip_deserializing)]
    Unrecognized,
}

impl Role {
    pub fn from_db(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            "staff" => Role::Staff,
            "user" => Role::User,
            _ => Role::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::User => "user",
            Role::Unrecognized => "unrecognized",
        }
    }
}

// ---
// 2. Principal (a identidade vinda do provedor de autenticação)
// ---
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub email: Option<String>,
}

// Estrutura de dados ("claims") dentro do JWT do provedor
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,          // Subject (ID do principal)
    pub email: Option<String>,
    pub exp: usize,         // Expiration time
}

// ---
// 3. Profile (o registro de aplicação: papel + filial)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    #[schema(example = "gerente@loja.com")]
    pub email: String,
    pub full_name: Option<String>,
    #[schema(example = "manager")]
    pub role: String,
    pub branch_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: Role::from_db(&self.role),
            branch_id: self.branch_id,
        }
    }
}

/// O que as políticas de acesso enxergam de um perfil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub branch_id: Option<Uuid>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn manages_branch(&self, branch_id: Uuid) -> bool {
        self.role == Role::Manager && self.branch_id == Some(branch_id)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOwnProfilePayload {
    #[validate(length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres."))]
    #[schema(example = "Maria da Silva")]
    pub full_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateProfilePayload {
    pub role: Option<Role>,
    // `Some(None)` remove a filial; ausente mantém
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub branch_id: Option<Option<Uuid>>,
}

/// Resultado do provisionamento (equivalente ao gatilho de cadastro).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedProfile {
    pub profile: Profile,
    // false quando o perfil já existia
    pub created: bool,
    pub joined_team_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionPayload {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_fail_closed() {
        assert_eq!(Role::from_db("owner"), Role::Unrecognized);
        assert_eq!(Role::from_db("ADMIN"), Role::Unrecognized);
        assert_eq!(Role::from_db("admin"), Role::Admin);
    }

    #[test]
    fn patch_distinguishes_missing_and_null_branch() {
        let missing: AdminUpdateProfilePayload = serde_json::from_str(r#"{"role":"staff"}"#).unwrap();
        assert_eq!(missing.branch_id, None);

        let cleared: AdminUpdateProfilePayload = serde_json::from_str(r#"{"branchId":null}"#).unwrap();
        assert_eq!(cleared.branch_id, Some(None));
    }
}
