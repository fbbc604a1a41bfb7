//! Montagem do AppState com colaboradores em memória para os testes HTTP.
//! Nenhum teste aqui precisa de Postgres: as pools das lojas são "lazy".

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use store_backend::{
    common::error::TenantError,
    db::memory::{InMemoryAuditStore, InMemoryDirectory},
    models::{
        audit::AuditEntry,
        auth::{Claims, GlobalRole, User},
        tenancy::{Store, UserStoreMapping},
    },
    services::{
        audit::AuditSink,
        permission::PolicyTable,
        tenant_registry::{TenantConnector, TenantDataSource},
        token::TokenService,
    },
    AppState,
};

pub const SECRET: &str = "test-secret-key-for-testing-only-32chars";

pub struct CountingConnector {
    attempts: AtomicUsize,
    delay: Duration,
}

impl CountingConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TenantConnector for CountingConnector {
    async fn connect(&self, store: &Store) -> Result<TenantDataSource, TenantError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tenants")
            .map_err(|e| TenantError::Connection {
                store_id: store.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(TenantDataSource {
            store_id: store.id.clone(),
            schema: store.schema(),
            pool,
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingSink {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingSink {
    fn record(&self, entry: AuditEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

pub struct Fixture {
    pub state: AppState,
    pub directory: Arc<InMemoryDirectory>,
    pub connector: Arc<CountingConnector>,
    pub audit: Arc<RecordingSink>,
    pub tokens: TokenService,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_policy(PolicyTable::default())
    }

    pub fn with_policy(policy: PolicyTable) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        for id in ["S1", "S2", "store-A"] {
            directory.insert_store(Store {
                id: id.to_string(),
                name: format!("Loja {id}"),
                schema_name: None,
                is_active: true,
            });
        }

        let connector = Arc::new(CountingConnector {
            attempts: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
        });
        let audit = Arc::new(RecordingSink::default());
        let tokens = TokenService::new(SECRET, 3600);

        let mut state = AppState::from_parts(
            directory.clone(),
            connector.clone(),
            tokens.clone(),
            policy,
            Duration::from_secs(2),
            Arc::new(InMemoryAuditStore::new()),
            audit.clone(),
        );
        state.auth_service = state.auth_service.clone().with_bcrypt_cost(4);

        Self { state, directory, connector, audit, tokens }
    }

    /// Cria um usuário ativo com os mapeamentos informados e devolve um token válido.
    pub fn user(&self, role: GlobalRole, is_superadmin: bool, mappings: &[(&str, GlobalRole)]) -> (User, String) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: format!("user-{}", Uuid::new_v4().simple()),
            email: "user@loja.com".into(),
            password_hash: bcrypt::hash("senha123", 4).unwrap(),
            role,
            is_superadmin,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.directory.insert_user(user.clone());

        for (store_id, store_role) in mappings {
            self.directory.insert_mapping(UserStoreMapping {
                user_id: user.id,
                store_id: store_id.to_string(),
                role: *store_role,
                is_deleted: false,
            });
        }

        let store_ids = mappings.iter().map(|(id, _)| id.to_string()).collect();
        let token = self.tokens.issue_token(&user, store_ids).unwrap();
        (user, token)
    }

    /// Token assinado corretamente mas vencido há uma hora.
    pub fn expired_token(&self, user: &User) -> String {
        let exp = Utc::now().timestamp() - 3600;
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            associated_store_ids: vec![],
            is_superadmin: user.is_superadmin,
            iat: exp - 3600,
            exp,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }
}
