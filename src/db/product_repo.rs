// src/db/product_repo.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::products::Product;

// Tabela 'products' do schema da loja. A pool recebida já aponta para o schema certo.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, price, created_by, created_at, updated_at
            FROM products
            ORDER BY name
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, price, created_by, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn create(
        &self,
        sku: &str,
        name: &str,
        description: Option<&str>,
        price: Decimal,
        created_by: Uuid,
    ) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (sku, name, description, price, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, sku, name, description, price, created_by, created_at, updated_at
            "#,
        )
            .bind(sku)
            .bind(name)
            .bind(description)
            .bind(price)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;

        Ok(product)
    }

    // Campos ausentes mantêm o valor atual (COALESCE)
    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        price: Option<Decimal>,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                updated_at = now()
            WHERE id = $1
            RETURNING id, sku, name, description, price, created_by, created_at, updated_at
            "#,
        )
            .bind(id)
            .bind(name)
            .bind(description)
            .bind(price)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
