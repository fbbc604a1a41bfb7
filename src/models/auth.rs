// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::tenancy::UserStoreMapping;

// Cargo global do usuário. Também é usado como cargo por loja no mapeamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "global_role", rename_all = "snake_case")]
pub enum GlobalRole {
    AdminGlobal,
    StoreManager,
    StoreStaff,
    Viewer,
}

impl GlobalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalRole::AdminGlobal => "admin_global",
            GlobalRole::StoreManager => "store_manager",
            GlobalRole::StoreStaff => "store_staff",
            GlobalRole::Viewer => "viewer",
        }
    }
}

// Representa um usuário vindo do banco global
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub role: GlobalRole,
    pub is_superadmin: bool,
    pub is_active: bool,
    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Apenas usuários ativos e não removidos podem se autenticar.
    pub fn can_authenticate(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}

/// Identidade carregada pelo guard de autenticação para o resto da requisição.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user: User,
    pub store_mappings: Vec<UserStoreMapping>,
}

impl UserContext {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    /// Cargo do usuário dentro de uma loja, ignorando mapeamentos removidos.
    pub fn store_role(&self, store_id: &str) -> Option<GlobalRole> {
        self.store_mappings
            .iter()
            .find(|m| m.store_id == store_id && !m.is_deleted)
            .map(|m| m.role)
    }

    pub fn associated_store_ids(&self) -> Vec<String> {
        self.store_mappings
            .iter()
            .filter(|m| !m.is_deleted)
            .map(|m| m.store_id.clone())
            .collect()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserPayload {
    #[validate(length(min = 3, max = 64, message = "O nome de usuário deve ter entre 3 e 64 caracteres."))]
    pub username: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginUserPayload {
    #[validate(length(min = 1, message = "O nome de usuário é obrigatório."))]
    pub username: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub role: GlobalRole,
    pub associated_store_ids: Vec<String>,
    pub is_superadmin: bool,
    pub iat: i64,
    pub exp: i64,
}
