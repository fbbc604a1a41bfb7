// src/db/directory.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::{StoreRepository, UserRepository};
use crate::models::auth::{GlobalRole, User};
use crate::models::tenancy::{Store, UserStoreMapping};

/// Leituras (e o cadastro) que o núcleo de auth/tenancy faz no banco global.
#[async_trait]
pub trait GlobalDirectory: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: GlobalRole,
    ) -> Result<User, AppError>;

    async fn find_user_store_mappings(&self, user_id: Uuid) -> Result<Vec<UserStoreMapping>, AppError>;

    async fn find_store(&self, store_id: &str) -> Result<Option<Store>, AppError>;
}

// Implementação Postgres: só junta os dois repositórios
#[derive(Clone)]
pub struct PgDirectory {
    users: UserRepository,
    stores: StoreRepository,
}

impl PgDirectory {
    pub fn new(users: UserRepository, stores: StoreRepository) -> Self {
        Self { users, stores }
    }
}

#[async_trait]
impl GlobalDirectory for PgDirectory {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.users.find_by_id(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.users.find_by_username(username).await
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: GlobalRole,
    ) -> Result<User, AppError> {
        self.users.create_user(username, email, password_hash, role).await
    }

    async fn find_user_store_mappings(&self, user_id: Uuid) -> Result<Vec<UserStoreMapping>, AppError> {
        self.users.find_store_mappings(user_id).await
    }

    async fn find_store(&self, store_id: &str) -> Result<Option<Store>, AppError> {
        self.stores.find_by_id(store_id).await
    }
}
