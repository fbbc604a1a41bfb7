// src/services/tenant_registry.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};

use crate::{
    common::error::TenantError,
    db::GlobalDirectory,
    models::tenancy::Store,
};

/// Conexão (pool) com o schema isolado de uma loja.
#[derive(Debug)]
pub struct TenantDataSource {
    pub store_id: String,
    pub schema: String,
    pub pool: PgPool,
}

/// Abre a pool de uma loja. Separado do registro para poder ser trocado nos testes.
#[async_trait]
pub trait TenantConnector: Send + Sync {
    async fn connect(&self, store: &Store) -> Result<TenantDataSource, TenantError>;
}

// ---
// Conector Postgres: uma pool por loja, com search_path fixado no schema dela
// ---
pub struct PgTenantConnector {
    database_url: String,
    max_connections: u32,
}

impl PgTenantConnector {
    pub fn new(database_url: String, max_connections: u32) -> Self {
        Self { database_url, max_connections }
    }
}

#[async_trait]
impl TenantConnector for PgTenantConnector {
    async fn connect(&self, store: &Store) -> Result<TenantDataSource, TenantError> {
        let schema = store.schema();
        // O nome já foi sanitizado em Store::schema(); aspas por causa de maiúsculas/reservadas.
        let set_search_path = format!("SET search_path TO \"{}\"", schema);

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .after_connect(move |conn, _meta| {
                let statement = set_search_path.clone();
                Box::pin(async move {
                    conn.execute(statement.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&self.database_url)
            .await
            .map_err(|e| TenantError::Connection {
                store_id: store.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(TenantDataSource {
            store_id: store.id.clone(),
            schema,
            pool,
        })
    }
}

// ---
// O registro: uma abertura compartilhada por loja
// ---

// Abertura da pool de uma loja. Todos que esperam pela mesma loja recebem o
// mesmo resultado, inclusive o erro.
type PendingDataSource = Shared<BoxFuture<'static, Result<Arc<TenantDataSource>, TenantError>>>;

pub struct TenantRegistry {
    directory: Arc<dyn GlobalDirectory>,
    connector: Arc<dyn TenantConnector>,
    acquire_timeout: Duration,
    cache: DashMap<String, Arc<PendingDataSource>>,
}

impl TenantRegistry {
    pub fn new(
        directory: Arc<dyn GlobalDirectory>,
        connector: Arc<dyn TenantConnector>,
        acquire_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            connector,
            acquire_timeout,
            cache: DashMap::new(),
        }
    }

    /// Devolve o handle da loja, abrindo a pool no primeiro acesso.
    ///
    /// Chamadas concorrentes para a mesma loja ainda não aberta compartilham
    /// uma única tentativa de conexão. Falhas não ficam em cache.
    pub async fn get_tenant_data_source(&self, store_id: &str) -> Result<Arc<TenantDataSource>, TenantError> {
        // O guard do DashMap é solto antes do await.
        let slot = self
            .cache
            .entry(store_id.to_string())
            .or_insert_with(|| Arc::new(self.setup(store_id)))
            .clone();

        let result = slot.as_ref().clone().await;
        if result.is_err() {
            // Só remove a tentativa que falhou; uma nova pode já estar no lugar.
            self.cache.remove_if(store_id, |_, current| Arc::ptr_eq(current, &slot));
        }
        result
    }

    fn setup(&self, store_id: &str) -> PendingDataSource {
        open(
            self.directory.clone(),
            self.connector.clone(),
            self.acquire_timeout,
            store_id.to_string(),
        )
        .boxed()
        .shared()
    }

    /// Lojas com handle aberto no momento.
    pub fn cached_store_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .cache
            .iter()
            .filter(|entry| matches!(entry.value().peek(), Some(Ok(_))))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Remoção administrativa de uma loja. Devolve `true` se havia handle aberto.
    ///
    /// Uma abertura em andamento é esperada e a pool resultante é fechada.
    pub async fn evict(&self, store_id: &str) -> bool {
        let Some((_, slot)) = self.cache.remove(store_id) else {
            return false;
        };

        match slot.as_ref().clone().await {
            Ok(handle) => {
                handle.pool.close().await;
                tracing::info!("🧹 Conexão da loja '{}' encerrada", store_id);
                true
            }
            Err(_) => false,
        }
    }

    /// Fecha todas as pools. Chamado no desligamento do processo.
    pub async fn drain(&self) {
        let store_ids: Vec<String> = self.cache.iter().map(|entry| entry.key().clone()).collect();
        let mut closed = 0;
        for store_id in store_ids {
            if self.evict(&store_id).await {
                closed += 1;
            }
        }
        tracing::info!("🧹 {} conexões de loja encerradas", closed);
    }
}

async fn open(
    directory: Arc<dyn GlobalDirectory>,
    connector: Arc<dyn TenantConnector>,
    acquire_timeout: Duration,
    store_id: String,
) -> Result<Arc<TenantDataSource>, TenantError> {
    let store = directory
        .find_store(&store_id)
        .await
        .map_err(|e| TenantError::Connection {
            store_id: store_id.clone(),
            reason: e.to_string(),
        })?
        .filter(|store| store.is_active)
        .ok_or_else(|| TenantError::NotFound(store_id.clone()))?;

    tracing::info!("🔌 Abrindo conexão da loja '{}' (schema '{}')", store.id, store.schema());

    let data_source = tokio::time::timeout(acquire_timeout, connector.connect(&store))
        .await
        .map_err(|_| TenantError::Timeout(store_id.clone()))??;

    tracing::info!("✅ Loja '{}' conectada", store.id);
    Ok(Arc::new(data_source))
}
