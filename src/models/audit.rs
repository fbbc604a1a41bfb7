// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// Registro de auditoria emitido pelo guard depois de uma mutação bem-sucedida
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub user_id: Uuid,
    pub action: String,
    pub target_table: String,
    pub target_id: Option<String>,
    pub store_id: Option<String>,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<i64>,
}
