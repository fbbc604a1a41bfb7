// src/handlers/audit.rs

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::audit::{AuditEntry, AuditLogQuery},
};

const DEFAULT_AUDIT_LIMIT: i64 = 50;
const MAX_AUDIT_LIMIT: i64 = 500;

// GET /api/tenant/{store_id}/audit-logs
pub async fn list_audit_logs(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT);

    let entries = app_state
        .audit_store
        .list_for_store(&tenant.store_id, limit)
        .await?;

    Ok(Json(entries))
}
