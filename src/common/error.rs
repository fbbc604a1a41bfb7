// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Falhas da verificação de token (Security/Token Service)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token inválido")]
    InvalidToken,

    #[error("Token expirado")]
    TokenExpired,
}

// Falhas da resolução do banco de dados da loja (Tenant DataSource Registry)
#[derive(Debug, Clone, Error)]
pub enum TenantError {
    #[error("Loja '{0}' não encontrada")]
    NotFound(String),

    #[error("Falha ao conectar ao banco da loja '{store_id}': {reason}")]
    Connection { store_id: String, reason: String },

    #[error("Tempo esgotado ao conectar ao banco da loja '{0}'")]
    Timeout(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Corpo da requisição maior que {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Nome de usuário já existe")]
    UsernameAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    // 401: cabeçalho ausente, assinatura inválida, usuário inativo etc.
    #[error("Token inválido")]
    InvalidToken,

    #[error("Token expirado")]
    TokenExpired,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("Loja '{0}' não encontrada")]
    TenantNotFound(String),

    #[error("Falha na conexão com a loja: {0}")]
    TenantConnection(String),

    // Rota declara um recurso que a tabela de políticas não conhece.
    #[error("Permissão mal configurada: {0}")]
    PermissionConfiguration(String),

    #[error("Recurso não encontrado")]
    NotFound,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => AppError::InvalidToken,
            TokenError::TokenExpired => AppError::TokenExpired,
        }
    }
}

impl From<TenantError> for AppError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::NotFound(store_id) => AppError::TenantNotFound(store_id),
            other => AppError::TenantConnection(other.to_string()),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UsernameAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::TenantNotFound(_) | AppError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::BadRequest(reason) => reason,
            AppError::PayloadTooLarge(limit) => {
                format!("O corpo da requisição excede o limite de {} bytes.", limit)
            }
            AppError::UsernameAlreadyExists => "Este nome de usuário já está em uso.".to_string(),
            AppError::InvalidCredentials => "Usuário ou senha inválidos.".to_string(),
            AppError::InvalidToken => "Token de autenticação inválido ou ausente.".to_string(),
            AppError::TokenExpired => "Token de autenticação expirado.".to_string(),
            AppError::Forbidden(reason) => reason,
            AppError::TenantNotFound(store_id) => format!("Loja '{}' não encontrada.", store_id),
            AppError::NotFound => "Recurso não encontrado.".to_string(),

            // Todo o resto vira 500; o detalhe fica só no log.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                "Ocorreu um erro inesperado.".to_string()
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_map_to_unauthorized() {
        assert_eq!(AppError::from(TokenError::InvalidToken).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(TokenError::TokenExpired).status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unknown_tenant_is_a_client_error_but_connection_failure_is_not() {
        let not_found = AppError::from(TenantError::NotFound("S9".into()));
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let broken = AppError::from(TenantError::Connection {
            store_id: "S9".into(),
            reason: "connection refused".into(),
        });
        assert_eq!(broken.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let slow = AppError::from(TenantError::Timeout("S9".into()));
        assert_eq!(slow.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn permission_misconfiguration_is_a_server_error() {
        let err = AppError::PermissionConfiguration("unknown resource 'widgets'".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn oversized_body_is_distinct_from_bad_request() {
        assert_eq!(AppError::PayloadTooLarge(1024).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(AppError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
    }
}
