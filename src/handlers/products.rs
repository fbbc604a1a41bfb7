// src/handlers/products.rs

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::ProductRepository,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::products::{CreateProductPayload, Product, UpdateProductPayload},
};

// A permissão já foi checada pelo guard da rota; aqui só falamos com o schema da loja.
fn repo(tenant: &TenantContext) -> ProductRepository {
    ProductRepository::new(tenant.data_source.pool.clone())
}

pub async fn list_products(tenant: TenantContext) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(repo(&tenant).list().await?))
}

pub async fn get_product(
    tenant: TenantContext,
    Path((_store_id, id)): Path<(String, Uuid)>,
) -> Result<Json<Product>, AppError> {
    repo(&tenant)
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn create_product(
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let product = repo(&tenant)
        .create(
            &payload.sku,
            &payload.name,
            payload.description.as_deref(),
            payload.price,
            user.0.id(),
        )
        .await?;

    tracing::info!("📦 Produto '{}' criado na loja '{}'", product.sku, tenant.store_id);
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    tenant: TenantContext,
    Path((_store_id, id)): Path<(String, Uuid)>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<Json<Product>, AppError> {
    payload.validate()?;

    repo(&tenant)
        .update(id, payload.name.as_deref(), payload.description.as_deref(), payload.price)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn delete_product(
    tenant: TenantContext,
    Path((_store_id, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    if repo(&tenant).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
