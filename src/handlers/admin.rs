// src/handlers/admin.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{common::error::AppError, config::AppState};

// GET /api/admin/tenants
pub async fn list_cached_tenants(State(app_state): State<AppState>) -> Json<Vec<String>> {
    Json(app_state.tenants.cached_store_ids())
}

// DELETE /api/admin/tenants/{store_id}
pub async fn evict_tenant(
    State(app_state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if app_state.tenants.evict(&store_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
