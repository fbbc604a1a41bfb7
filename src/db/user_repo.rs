// src/db/user_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::auth::{GlobalRole, User};
use crate::models::tenancy::UserStoreMapping;

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, role,
    is_superadmin, is_active, is_deleted,
    created_at, updated_at
"#;

// O repositório de usuários do banco global ('users' e 'user_store_mappings')
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let maybe_user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let maybe_user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    // Cria um novo usuário com o cargo global informado.
    // Nome de usuário duplicado vira um erro específico.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: GlobalRole,
    ) -> Result<User, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::UsernameAlreadyExists;
                    }
                }
                e.into()
            })?;

        Ok(user)
    }

    /// Mapeamentos usuário-loja ainda ativos (soft delete fica de fora).
    pub async fn find_store_mappings(&self, user_id: Uuid) -> Result<Vec<UserStoreMapping>, AppError> {
        let mappings = sqlx::query_as::<_, UserStoreMapping>(
            r#"
            SELECT user_id, store_id, role, is_deleted
            FROM user_store_mappings
            WHERE user_id = $1 AND is_deleted = false
            ORDER BY store_id
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(mappings)
    }
}
