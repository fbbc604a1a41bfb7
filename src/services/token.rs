// src/services/token.rs

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use crate::{
    common::error::{AppError, TokenError},
    models::auth::{Claims, User},
};

/// Emite e verifica os tokens de sessão (JWT HS256).
/// O segredo é carregado uma vez no startup e nunca muda em tempo de execução.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl TokenService {
    pub fn new(jwt_secret: &str, expiration_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            expiration_secs,
        }
    }

    pub fn expiration_secs(&self) -> i64 {
        self.expiration_secs
    }

    pub fn issue_token(&self, user: &User, associated_store_ids: Vec<String>) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        self.encode_claims(&Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            associated_store_ids,
            is_superadmin: user.is_superadmin,
            iat: now,
            exp: now + self.expiration_secs,
        })
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String, AppError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        match decode::<Claims>(token, &self.decoding_key, &strict_validation()) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(TokenError::TokenExpired),
            Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => {
                // Token vencido é reportado como vencido mesmo com assinatura errada.
                if self.is_expired_ignoring_signature(token) {
                    Err(TokenError::TokenExpired)
                } else {
                    Err(TokenError::InvalidToken)
                }
            }
            Err(e) => {
                tracing::debug!("Token rejeitado: {:?}", e.kind());
                Err(TokenError::InvalidToken)
            }
        }
    }

    fn is_expired_ignoring_signature(&self, token: &str) -> bool {
        let mut validation = strict_validation();
        validation.insecure_disable_signature_validation();

        matches!(
            decode::<Claims>(token, &self.decoding_key, &validation),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature)
        )
    }
}

fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation
}
