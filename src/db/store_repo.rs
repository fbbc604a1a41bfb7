// src/db/store_repo.rs

use sqlx::PgPool;

use crate::common::error::AppError;
use crate::models::tenancy::Store;

// Lojas (tenants) cadastradas no banco global
#[derive(Clone)]
pub struct StoreRepository {
    pool: PgPool,
}

impl StoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, store_id: &str) -> Result<Option<Store>, AppError> {
        let store = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, name, schema_name, is_active
            FROM stores
            WHERE id = $1
            "#,
        )
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(store)
    }
}
