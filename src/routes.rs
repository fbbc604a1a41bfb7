// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};

use crate::{
    config::AppState,
    handlers,
    middleware::{
        auth::auth_guard,
        rbac::{permission_guard, RouteGuard},
        tenancy::tenant_guard,
    },
    models::rbac::{Action, PermissionRequirement},
};

// ---
// Tabela de permissões por rota
// ---
pub const STORE_SESSION: PermissionRequirement = PermissionRequirement::new("store", Action::Read);
pub const PRODUCTS_LIST: PermissionRequirement = PermissionRequirement::new("products", Action::List);
pub const PRODUCTS_READ: PermissionRequirement = PermissionRequirement::new("products", Action::Read);
pub const PRODUCTS_CREATE: PermissionRequirement =
    PermissionRequirement::new("products", Action::Create).audited("products");
pub const PRODUCTS_UPDATE: PermissionRequirement =
    PermissionRequirement::new("products", Action::Update).audited("products");
pub const PRODUCTS_DELETE: PermissionRequirement =
    PermissionRequirement::new("products", Action::Delete).audited("products");
pub const AUDIT_LOGS_LIST: PermissionRequirement = PermissionRequirement::new("audit_logs", Action::List);
pub const TENANTS_LIST: PermissionRequirement = PermissionRequirement::new("tenant_registry", Action::List);
pub const TENANTS_EVICT: PermissionRequirement =
    PermissionRequirement::new("tenant_registry", Action::Delete).audited("tenant_registry");

/// Todas as exigências declaradas, conferidas contra a tabela de políticas no startup.
pub const ROUTE_REQUIREMENTS: &[PermissionRequirement] = &[
    STORE_SESSION,
    PRODUCTS_LIST,
    PRODUCTS_READ,
    PRODUCTS_CREATE,
    PRODUCTS_UPDATE,
    PRODUCTS_DELETE,
    AUDIT_LOGS_LIST,
    TENANTS_LIST,
    TENANTS_EVICT,
];

/// Prende a exigência de permissão a um handler.
pub fn guarded(
    state: &AppState,
    method_router: MethodRouter<AppState>,
    requirement: PermissionRequirement,
) -> MethodRouter<AppState> {
    method_router.route_layer(axum_middleware::from_fn_with_state(
        RouteGuard::new(state.clone(), requirement),
        permission_guard,
    ))
}

pub fn create_app(app_state: AppState) -> Router {
    for requirement in ROUTE_REQUIREMENTS {
        if let Err(e) = app_state.permissions.ensure_known(requirement.resource) {
            tracing::error!("🔥 {}", e);
        }
    }

    let state = &app_state;

    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Define as rotas de usuário (só autenticação)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/stores", get(handlers::auth::get_my_stores))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), auth_guard));

    // Rotas da loja: auth -> loja -> permissão -> handler
    let tenant_routes = Router::new()
        .route(
            "/session",
            guarded(state, get(handlers::tenancy::get_session), STORE_SESSION),
        )
        .route(
            "/products",
            guarded(state, get(handlers::products::list_products), PRODUCTS_LIST)
                .merge(guarded(state, post(handlers::products::create_product), PRODUCTS_CREATE)),
        )
        .route(
            "/products/{id}",
            guarded(state, get(handlers::products::get_product), PRODUCTS_READ)
                .merge(guarded(state, put(handlers::products::update_product), PRODUCTS_UPDATE))
                .merge(guarded(state, delete(handlers::products::delete_product), PRODUCTS_DELETE)),
        )
        .route(
            "/audit-logs",
            guarded(state, get(handlers::audit::list_audit_logs), AUDIT_LOGS_LIST),
        )
        // A última camada adicionada roda primeiro.
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), tenant_guard))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), auth_guard));

    let admin_routes = Router::new()
        .route(
            "/tenants",
            guarded(state, get(handlers::admin::list_cached_tenants), TENANTS_LIST),
        )
        .route(
            "/tenants/{store_id}",
            guarded(state, delete(handlers::admin::evict_tenant), TENANTS_EVICT),
        )
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), auth_guard));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/tenant/{store_id}", tenant_routes)
        .nest("/api/admin", admin_routes)
        .with_state(app_state)
}
