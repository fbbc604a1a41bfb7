// src/handlers/tenancy.rs

use axum::Json;

use crate::{
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::tenancy::TenantSession,
};

// GET /api/tenant/{store_id}/session
// O frontend usa para saber com qual cargo o usuário está operando na loja.
pub async fn get_session(
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
) -> Json<TenantSession> {
    Json(TenantSession {
        store_role: user.store_role(&tenant.store_id),
        store_id: tenant.store_id,
        schema: tenant.data_source.schema.clone(),
        user_id: user.id(),
        global_role: user.user.role,
        is_superadmin: user.user.is_superadmin,
    })
}
