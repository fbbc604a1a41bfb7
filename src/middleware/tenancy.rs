// src/middleware/tenancy.rs

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    services::tenant_registry::TenantDataSource,
};

// Nome do parâmetro de rota que identifica a loja
pub const STORE_ID_PARAM: &str = "store_id";

// Loja resolvida para a requisição, com a pool já aberta.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub store_id: String,
    pub data_source: Arc<TenantDataSource>,
}

// Etapa 2 da cadeia: `{store_id}` da rota -> registro de conexões.
// Loja desconhecida vira 404; falha de conexão vira 500.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(store_id) = params.get(STORE_ID_PARAM) {
        let data_source = app_state
            .tenants
            .get_tenant_data_source(store_id)
            .await
            .inspect_err(|e| tracing::warn!("Loja '{}' não resolvida: {}", store_id, e))?;

        request.extensions_mut().insert(TenantContext {
            store_id: store_id.clone(),
            data_source,
        });
    }

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| AppError::BadRequest("Contexto da loja não encontrado.".into()))
    }
}
