// src/middleware/rbac.rs

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::{audit::AuditEntry, rbac::PermissionRequirement},
    services::permission::RequestContext,
};

// Corpo lido pelo guard para avaliar condições
pub const MAX_GUARDED_BODY_BYTES: usize = 1024 * 1024;

/// Estado do guard de uma rota: o AppState mais o que a rota declarou.
#[derive(Clone)]
pub struct RouteGuard {
    pub state: AppState,
    pub requirement: PermissionRequirement,
}

impl RouteGuard {
    pub fn new(state: AppState, requirement: PermissionRequirement) -> Self {
        Self { state, requirement }
    }
}

// Etapa 3 da cadeia: avalia a permissão declarada pela rota.
// Depois do handler, mutações bem-sucedidas vão para a auditoria (sem esperar).
pub async fn permission_guard(
    State(guard): State<RouteGuard>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let RouteGuard { state, requirement } = guard;

    // A. Extrai Usuário
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AppError::InvalidToken)?;

    // B. Loja (só existe em rotas de loja)
    let store_id = request
        .extensions()
        .get::<TenantContext>()
        .map(|tenant| tenant.store_id.clone());

    state.permissions.ensure_known(requirement.resource)?;

    // C. Lê o corpo para as condições e devolve ele intacto para o handler
    let (parts, body) = request.into_parts();
    let bytes = read_limited(body).await?;
    let body_json = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice::<Value>(&bytes).ok()
    };

    let ctx = RequestContext {
        store_id: store_id.clone(),
        params: params.clone(),
        body: body_json,
    };

    // D. Decide
    if !state.permissions.has_permission(&user.0, requirement.resource, requirement.action, &ctx) {
        tracing::warn!(
            "⛔ Usuário {} sem permissão '{}:{}' (loja: {:?})",
            user.0.user.username,
            requirement.resource,
            requirement.action.as_str(),
            store_id
        );
        return Err(AppError::Forbidden(format!(
            "Você precisa da permissão '{}:{}' para realizar esta ação.",
            requirement.resource,
            requirement.action.as_str()
        )));
    }

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    if let Some(table) = requirement.audit_table {
        if requirement.action.is_mutation() && response.status().is_success() {
            state.audit_sink.record(AuditEntry {
                user_id: user.0.id(),
                action: requirement.action.as_str().to_string(),
                target_table: table.to_string(),
                target_id: params.get("id").or_else(|| params.get("store_id")).cloned(),
                store_id,
                metadata: json!({
                    "method": method.as_str(),
                    "path": path,
                    "status": response.status().as_u16(),
                }),
                timestamp: Utc::now(),
            });
        }
    }

    Ok(response)
}

// Acima do limite é 413; erro de leitura é 400.
async fn read_limited(body: Body) -> Result<Vec<u8>, AppError> {
    let mut stream = body.into_data_stream();
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|_| AppError::BadRequest("Corpo da requisição ilegível.".into()))?;
        if bytes.len() + chunk.len() > MAX_GUARDED_BODY_BYTES {
            return Err(AppError::PayloadTooLarge(MAX_GUARDED_BODY_BYTES));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
