// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{AuditRepository, AuditStore, GlobalDirectory, PgDirectory, StoreRepository, UserRepository},
    services::{
        audit::{AuditSink, QueuedAuditSink},
        auth::AuthService,
        permission::{PermissionEvaluator, PolicyTable},
        tenant_registry::{PgTenantConnector, TenantConnector, TenantRegistry},
        token::TokenService,
    },
};

const INSECURE_DEFAULT_JWT_SECRET: &str = "change-me-insecure-default-secret";

// Configuração lida do ambiente (.env) uma única vez no startup
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub tenant_database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: i64,
    pub tenant_pool_max_connections: u32,
    pub tenant_acquire_timeout: Duration,
    pub policy_file: Option<PathBuf>,
    pub audit_queue_capacity: usize,
    pub server_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL deve ser definida"))?;
        let tenant_database_url = env::var("TENANT_DATABASE_URL").unwrap_or_else(|_| database_url.clone());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::error!("🔥 JWT_SECRET não definido: usando o segredo padrão inseguro. Corrija a configuração!");
                INSECURE_DEFAULT_JWT_SECRET.to_string()
            }
        };

        Ok(Self {
            database_url,
            tenant_database_url,
            jwt_secret,
            jwt_expiration_secs: parse_var("JWT_EXPIRATION_SECS", 3600)?,
            tenant_pool_max_connections: parse_var("TENANT_POOL_MAX_CONNECTIONS", 5)?,
            tenant_acquire_timeout: Duration::from_secs(parse_var("TENANT_ACQUIRE_TIMEOUT_SECS", 5)?),
            policy_file: env::var("POLICY_FILE").ok().map(PathBuf::from),
            audit_queue_capacity: parse_var("AUDIT_QUEUE_CAPACITY", 1024)?,
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválido ('{}'): {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub directory: Arc<dyn GlobalDirectory>,
    pub tenants: Arc<TenantRegistry>,
    pub permissions: Arc<PermissionEvaluator>,
    pub audit_sink: Arc<dyn AuditSink>,
    pub audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    /// Monta o grafo de dependências a partir dos colaboradores já criados.
    pub fn from_parts(
        directory: Arc<dyn GlobalDirectory>,
        connector: Arc<dyn TenantConnector>,
        tokens: TokenService,
        policy: PolicyTable,
        tenant_acquire_timeout: Duration,
        audit_store: Arc<dyn AuditStore>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            auth_service: AuthService::new(directory.clone(), tokens),
            tenants: Arc::new(TenantRegistry::new(directory.clone(), connector, tenant_acquire_timeout)),
            directory,
            permissions: Arc::new(PermissionEvaluator::new(policy)),
            audit_sink,
            audit_store,
        }
    }

    /// Conecta ao banco global e liga tudo. Devolve também a fila de auditoria
    /// para o `main` poder esvaziá-la no desligamento.
    pub async fn new(config: &Config) -> anyhow::Result<(Self, Arc<QueuedAuditSink>)> {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco global estabelecida com sucesso!");

        let policy = match &config.policy_file {
            Some(path) => {
                tracing::info!("📜 Carregando políticas de {}", path.display());
                PolicyTable::from_json_file(path)?
            }
            None => PolicyTable::default(),
        };

        let directory: Arc<dyn GlobalDirectory> = Arc::new(PgDirectory::new(
            UserRepository::new(db_pool.clone()),
            StoreRepository::new(db_pool.clone()),
        ));
        let connector = Arc::new(PgTenantConnector::new(
            config.tenant_database_url.clone(),
            config.tenant_pool_max_connections,
        ));
        let audit_store: Arc<dyn AuditStore> = Arc::new(AuditRepository::new(db_pool));
        let audit_sink = Arc::new(QueuedAuditSink::spawn(audit_store.clone(), config.audit_queue_capacity));

        let state = Self::from_parts(
            directory,
            connector,
            TokenService::new(&config.jwt_secret, config.jwt_expiration_secs),
            policy,
            config.tenant_acquire_timeout,
            audit_store,
            audit_sink.clone(),
        );

        Ok((state, audit_sink))
    }
}
