// src/db/memory.rs

//! Implementações em memória do diretório global e do destino de auditoria.
//! Servem para testes e para subir o servidor sem banco global.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::audit_repo::AuditStore;
use crate::db::directory::GlobalDirectory;
use crate::models::audit::AuditEntry;
use crate::models::auth::{GlobalRole, User};
use crate::models::tenancy::{Store, UserStoreMapping};

#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<Uuid, User>>,
    mappings: RwLock<Vec<UserStoreMapping>>,
    stores: RwLock<HashMap<String, Store>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users.write().unwrap_or_else(|e| e.into_inner()).insert(user.id, user);
    }

    pub fn insert_store(&self, store: Store) {
        self.stores.write().unwrap_or_else(|e| e.into_inner()).insert(store.id.clone(), store);
    }

    pub fn insert_mapping(&self, mapping: UserStoreMapping) {
        self.mappings.write().unwrap_or_else(|e| e.into_inner()).push(mapping);
    }
}

#[async_trait]
impl GlobalDirectory for InMemoryDirectory {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: GlobalRole,
    ) -> Result<User, AppError> {
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        if users.values().any(|u| u.username == username) {
            return Err(AppError::UsernameAlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            is_superadmin: false,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_store_mappings(&self, user_id: Uuid) -> Result<Vec<UserStoreMapping>, AppError> {
        let mappings = self.mappings.read().unwrap_or_else(|e| e.into_inner());
        Ok(mappings
            .iter()
            .filter(|m| m.user_id == user_id && !m.is_deleted)
            .cloned()
            .collect())
    }

    async fn find_store(&self, store_id: &str) -> Result<Option<Store>, AppError> {
        let stores = self.stores.read().unwrap_or_else(|e| e.into_inner());
        Ok(stores.get(store_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AppError> {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).push(entry.clone());
        Ok(())
    }

    async fn list_for_store(&self, store_id: &str, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.store_id.as_deref() == Some(store_id))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
