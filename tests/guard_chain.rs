mod support;

use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use axum_test::TestServer;
use serde_json::{json, Value};

use store_backend::{
    create_app,
    middleware::{auth::auth_guard, rbac::MAX_GUARDED_BODY_BYTES, tenancy::tenant_guard},
    models::{
        auth::GlobalRole,
        rbac::{Action, PermissionRequirement},
        tenancy::TenantSession,
    },
    routes::{guarded, PRODUCTS_CREATE, PRODUCTS_DELETE},
    AppState,
};

use support::Fixture;

// Rotas de loja com handlers que não tocam no banco, montadas igual ao create_app.
fn stub_app(state: &AppState, extra: Option<PermissionRequirement>) -> Router {
    let mut tenant = Router::new()
        .route(
            "/products",
            guarded(state, post(|| async { StatusCode::CREATED }), PRODUCTS_CREATE),
        )
        .route(
            "/products/{id}",
            guarded(state, delete(|| async { StatusCode::NO_CONTENT }), PRODUCTS_DELETE),
        );
    if let Some(requirement) = extra {
        tenant = tenant.route("/extra", guarded(state, get(|| async { "ok" }), requirement));
    }

    let tenant = tenant
        .route_layer(from_fn_with_state(state.clone(), tenant_guard))
        .route_layer(from_fn_with_state(state.clone(), auth_guard));

    Router::new()
        .nest("/api/tenant/{store_id}", tenant)
        .with_state(state.clone())
}

#[tokio::test]
async fn missing_header_is_unauthorized() {
    let fx = Fixture::new();
    let server = TestServer::new(create_app(fx.state.clone())).unwrap();

    let response = server.get("/api/tenant/S1/session").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(fx.connector.attempts(), 0);
}

#[tokio::test]
async fn expired_token_stops_before_tenant_resolution() {
    let fx = Fixture::new();
    let (user, _) = fx.user(GlobalRole::StoreManager, false, &[("S1", GlobalRole::StoreManager)]);
    let expired = fx.expired_token(&user);
    let server = TestServer::new(create_app(fx.state.clone())).unwrap();

    let response = server
        .get("/api/tenant/S1/session")
        .authorization_bearer(expired)
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("expirado"));
    assert_eq!(fx.connector.attempts(), 0);
    assert!(fx.state.tenants.cached_store_ids().is_empty());
}

#[tokio::test]
async fn token_for_deleted_user_is_unauthorized() {
    let fx = Fixture::new();
    let (mut user, token) = fx.user(GlobalRole::StoreManager, false, &[("S1", GlobalRole::StoreManager)]);
    user.is_deleted = true;
    fx.directory.insert_user(user);
    let server = TestServer::new(create_app(fx.state.clone())).unwrap();

    let response = server.get("/api/users/me").authorization_bearer(token).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_store_is_not_found() {
    let fx = Fixture::new();
    let (_, token) = fx.user(GlobalRole::StoreManager, false, &[("S1", GlobalRole::StoreManager)]);
    let server = TestServer::new(create_app(fx.state.clone())).unwrap();

    let response = server
        .get("/api/tenant/does-not-exist/session")
        .authorization_bearer(token)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(fx.connector.attempts(), 0);
}

#[tokio::test]
async fn mapped_user_gets_session_with_store_role() {
    let fx = Fixture::new();
    let (user, token) = fx.user(GlobalRole::Viewer, false, &[("store-A", GlobalRole::StoreStaff)]);
    let server = TestServer::new(create_app(fx.state.clone())).unwrap();

    let response = server
        .get("/api/tenant/store-A/session")
        .authorization_bearer(token)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let session: TenantSession = response.json();
    assert_eq!(session.store_id, "store-A");
    assert_eq!(session.schema, "store_store_a");
    assert_eq!(session.user_id, user.id);
    assert_eq!(session.global_role, GlobalRole::Viewer);
    assert_eq!(session.store_role, Some(GlobalRole::StoreStaff));
}

#[tokio::test]
async fn superadmin_without_mapping_is_allowed() {
    let fx = Fixture::new();
    let (_, token) = fx.user(GlobalRole::Viewer, true, &[]);
    let server = TestServer::new(create_app(fx.state.clone())).unwrap();

    let response = server.get("/api/tenant/S1/session").authorization_bearer(token).await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn user_without_mapping_is_forbidden_after_resolution() {
    let fx = Fixture::new();
    let (_, token) = fx.user(GlobalRole::StoreManager, false, &[("S2", GlobalRole::StoreManager)]);
    let server = TestServer::new(create_app(fx.state.clone())).unwrap();

    let response = server.get("/api/tenant/S1/session").authorization_bearer(token).await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    // A loja foi resolvida antes da decisão de permissão.
    assert_eq!(fx.connector.attempts(), 1);
}

#[tokio::test]
async fn concurrent_first_requests_open_one_pool() {
    let fx = Fixture::new();
    let (_, token) = fx.user(GlobalRole::Viewer, false, &[("S2", GlobalRole::StoreManager)]);
    let server = TestServer::new(create_app(fx.state.clone())).unwrap();

    let (first, second) = tokio::join!(
        async { server.get("/api/tenant/S2/session").authorization_bearer(&token).await },
        async { server.get("/api/tenant/S2/session").authorization_bearer(&token).await },
    );

    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(second.status_code(), StatusCode::OK);
    assert_eq!(fx.connector.attempts(), 1);
    assert_eq!(fx.state.tenants.cached_store_ids(), vec!["S2".to_string()]);
}

#[tokio::test]
async fn store_role_overrides_global_role_for_mutations() {
    let fx = Fixture::new();
    let (_, token) = fx.user(GlobalRole::StoreStaff, false, &[("S1", GlobalRole::StoreManager)]);
    let server = TestServer::new(stub_app(&fx.state, None)).unwrap();

    let response = server
        .delete("/api/tenant/S1/products/42")
        .authorization_bearer(token)
        .await;

    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn viewer_cannot_create_products() {
    let fx = Fixture::new();
    let (_, token) = fx.user(GlobalRole::Viewer, false, &[("S1", GlobalRole::Viewer)]);
    let server = TestServer::new(stub_app(&fx.state, None)).unwrap();

    let response = server
        .post("/api/tenant/S1/products")
        .authorization_bearer(token)
        .json(&json!({ "sku": "P-1", "name": "Café", "price": 10.0 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("products:create"));
    assert!(fx.audit.entries().is_empty());
}

#[tokio::test]
async fn successful_mutation_is_audited() {
    let fx = Fixture::new();
    let (user, token) = fx.user(GlobalRole::Viewer, false, &[("S1", GlobalRole::StoreStaff)]);
    let server = TestServer::new(stub_app(&fx.state, None)).unwrap();

    let response = server
        .post("/api/tenant/S1/products")
        .authorization_bearer(token)
        .json(&json!({ "sku": "P-1", "name": "Café", "price": 10.0 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let entries = fx.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, user.id);
    assert_eq!(entries[0].action, "create");
    assert_eq!(entries[0].target_table, "products");
    assert_eq!(entries[0].store_id.as_deref(), Some("S1"));
    assert_eq!(entries[0].metadata["status"], 201);
}

#[tokio::test]
async fn oversized_body_is_payload_too_large() {
    let fx = Fixture::new();
    let (_, token) = fx.user(GlobalRole::Viewer, false, &[("S1", GlobalRole::StoreManager)]);
    let server = TestServer::new(stub_app(&fx.state, None)).unwrap();

    let response = server
        .post("/api/tenant/S1/products")
        .authorization_bearer(token)
        .text("x".repeat(MAX_GUARDED_BODY_BYTES + 1))
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(fx.audit.entries().is_empty());
}

#[tokio::test]
async fn route_with_unknown_resource_is_a_configuration_error() {
    let fx = Fixture::new();
    let (_, token) = fx.user(GlobalRole::AdminGlobal, false, &[("S1", GlobalRole::StoreManager)]);
    let requirement = PermissionRequirement::new("invoices", Action::Read);
    let server = TestServer::new(stub_app(&fx.state, Some(requirement))).unwrap();

    let response = server.get("/api/tenant/S1/extra").authorization_bearer(token).await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn only_admins_can_evict_tenants() {
    let fx = Fixture::new();
    let (_, admin_token) = fx.user(GlobalRole::AdminGlobal, false, &[]);
    let (_, staff_token) = fx.user(GlobalRole::StoreStaff, false, &[("S1", GlobalRole::StoreStaff)]);
    let server = TestServer::new(create_app(fx.state.clone())).unwrap();

    server
        .get("/api/tenant/S1/session")
        .authorization_bearer(&staff_token)
        .await
        .assert_status_ok();
    assert_eq!(fx.state.tenants.cached_store_ids(), vec!["S1".to_string()]);

    let denied = server
        .delete("/api/admin/tenants/S1")
        .authorization_bearer(&staff_token)
        .await;
    assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);

    let evicted = server
        .delete("/api/admin/tenants/S1")
        .authorization_bearer(&admin_token)
        .await;
    assert_eq!(evicted.status_code(), StatusCode::NO_CONTENT);
    assert!(fx.state.tenants.cached_store_ids().is_empty());

    let again = server
        .delete("/api/admin/tenants/S1")
        .authorization_bearer(&admin_token)
        .await;
    assert_eq!(again.status_code(), StatusCode::NOT_FOUND);
}
