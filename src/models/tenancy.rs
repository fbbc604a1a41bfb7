// src/models/tenancy.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::auth::GlobalRole;

// ---
// 1. Store (a "Loja", o tenant)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: String,
    pub name: String,
    // Schema explícito; quando ausente é derivado do id.
    pub schema_name: Option<String>,
    pub is_active: bool,
}

impl Store {
    /// Nome do schema Postgres da loja. Só aceita `[a-z0-9_]`, o resto vira `_`.
    pub fn schema(&self) -> String {
        match &self.schema_name {
            Some(name) if !name.is_empty() => sanitize_identifier(name),
            _ => format!("store_{}", sanitize_identifier(&self.id)),
        }
    }
}

fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }
        })
        .collect()
}

// ---
// 2. UserStoreMapping (a "Ponte" Usuário-Loja com cargo)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserStoreMapping {
    pub user_id: Uuid,
    pub store_id: String,
    pub role: GlobalRole,
    pub is_deleted: bool,
}

/// Resposta de `GET /api/tenant/{store_id}/session`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSession {
    pub store_id: String,
    pub schema: String,
    pub user_id: Uuid,
    pub global_role: GlobalRole,
    pub store_role: Option<GlobalRole>,
    pub is_superadmin: bool,
}
