// src/db/audit_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::error::AppError;
use crate::models::audit::AuditEntry;

/// Destino final dos registros de auditoria.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AppError>;

    async fn list_for_store(&self, store_id: &str, limit: i64) -> Result<Vec<AuditEntry>, AppError>;
}

// Tabela 'audit_logs' no banco global
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for AuditRepository {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, action, target_table, target_id, store_id, metadata, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
            .bind(entry.user_id)
            .bind(&entry.action)
            .bind(&entry.target_table)
            .bind(&entry.target_id)
            .bind(&entry.store_id)
            .bind(&entry.metadata)
            .bind(entry.timestamp)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_for_store(&self, store_id: &str, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT user_id, action, target_table, target_id, store_id, metadata, timestamp
            FROM audit_logs
            WHERE store_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
            .bind(store_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }
}
