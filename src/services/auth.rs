// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};

use crate::{
    common::error::AppError,
    db::GlobalDirectory,
    models::auth::{AuthResponse, Claims, GlobalRole, User, UserContext},
    services::token::TokenService,
};

#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn GlobalDirectory>,
    tokens: TokenService,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(directory: Arc<dyn GlobalDirectory>, tokens: TokenService) -> Self {
        Self { directory, tokens, bcrypt_cost: bcrypt::DEFAULT_COST }
    }

    /// Custo menor do bcrypt, útil nos testes.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    // Novos usuários entram como Viewer e sem acesso a nenhuma loja.
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AppError> {
        let password_clone = password.to_owned();
        let cost = self.bcrypt_cost;
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let user = self
            .directory
            .create_user(username, email, &hashed_password, GlobalRole::Viewer)
            .await?;

        tracing::info!("👤 Usuário '{}' registrado", user.username);
        self.respond_with_token(&user, Vec::new())
    }

    pub async fn login_user(&self, username: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .directory
            .find_user_by_username(username)
            .await?
            .filter(User::can_authenticate)
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        let store_ids = self
            .directory
            .find_user_store_mappings(user.id)
            .await?
            .into_iter()
            .map(|m| m.store_id)
            .collect();

        self.respond_with_token(&user, store_ids)
    }

    /// Carrega o usuário do token no banco global. Usuário sumido, inativo
    /// ou removido é tratado como token inválido.
    pub async fn load_context(&self, claims: &Claims) -> Result<UserContext, AppError> {
        let user = self
            .directory
            .find_user_by_id(claims.sub)
            .await?
            .filter(User::can_authenticate)
            .ok_or(AppError::InvalidToken)?;

        let store_mappings = self.directory.find_user_store_mappings(user.id).await?;

        Ok(UserContext { user, store_mappings })
    }

    fn respond_with_token(&self, user: &User, store_ids: Vec<String>) -> Result<AuthResponse, AppError> {
        Ok(AuthResponse {
            token: self.tokens.issue_token(user, store_ids)?,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.expiration_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryDirectory;
    use crate::models::tenancy::UserStoreMapping;
    use chrono::Utc;
    use uuid::Uuid;

    fn service(directory: Arc<InMemoryDirectory>) -> AuthService {
        AuthService::new(directory, TokenService::new("test-secret", 3600)).with_bcrypt_cost(4)
    }

    fn stored_user(username: &str, password: &str, is_active: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: format!("{username}@loja.com"),
            password_hash: hash(password, 4).unwrap(),
            role: GlobalRole::StoreStaff,
            is_superadmin: false,
            is_active,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn login_embeds_associated_stores() {
        let directory = Arc::new(InMemoryDirectory::new());
        let user = stored_user("ana", "senha123", true);
        directory.insert_mapping(UserStoreMapping {
            user_id: user.id,
            store_id: "S1".into(),
            role: GlobalRole::StoreManager,
            is_deleted: false,
        });
        directory.insert_user(user.clone());
        let auth = service(directory);

        let response = auth.login_user("ana", "senha123").await.unwrap();
        let claims = auth.tokens().verify_token(&response.token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.associated_store_ids, vec!["S1".to_string()]);
        assert_eq!(response.token_type, "Bearer");
    }

    #[tokio::test]
    async fn wrong_password_and_inactive_user_look_the_same() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.insert_user(stored_user("ana", "senha123", true));
        directory.insert_user(stored_user("beto", "senha123", false));
        let auth = service(directory);

        assert!(matches!(auth.login_user("ana", "errada").await, Err(AppError::InvalidCredentials)));
        assert!(matches!(auth.login_user("beto", "senha123").await, Err(AppError::InvalidCredentials)));
        assert!(matches!(auth.login_user("ninguem", "senha123").await, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn registered_user_can_log_in_as_viewer() {
        let auth = service(Arc::new(InMemoryDirectory::new()));

        auth.register_user("caio", "caio@loja.com", "senha123").await.unwrap();
        let response = auth.login_user("caio", "senha123").await.unwrap();
        let claims = auth.tokens().verify_token(&response.token).unwrap();

        assert_eq!(claims.role, GlobalRole::Viewer);
        assert!(!claims.is_superadmin);
        assert!(claims.associated_store_ids.is_empty());
    }

    #[tokio::test]
    async fn deleted_user_cannot_use_an_old_token() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut user = stored_user("dani", "senha123", true);
        let auth = service(directory.clone());
        let token = auth.tokens().issue_token(&user, vec![]).unwrap();
        let claims = auth.tokens().verify_token(&token).unwrap();

        user.is_deleted = true;
        directory.insert_user(user);

        assert!(matches!(auth.load_context(&claims).await, Err(AppError::InvalidToken)));
    }
}
