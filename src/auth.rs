//! Хеширование паролей (bcrypt) и выпуск/проверка JWT.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::models::{User, UserId};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        UserId(self.sub)
    }
}

#[derive(Clone)]
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expires_in: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expires_in: Duration::hours(config.expires_in_hours),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    // bcrypt грузит CPU - уводим с async-потоков
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
    }

    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();
        Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let exp = (Utc::now() + self.expires_in).timestamp().max(0) as usize;
        let claims = Claims {
            sub: user.id.0,
            username: user.username.clone(),
            exp,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn user() -> User {
        User {
            id: UserId(42),
            username: "alice".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip_carries_user_id() {
        let auth = AuthService::new(&Config::for_tests().auth);
        let token = auth.issue_token(&user()).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.user_id(), UserId(42));
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let mut cfg = Config::for_tests().auth;
        let token = AuthService::new(&cfg).issue_token(&user()).unwrap();
        cfg.jwt_secret = "another-secret".to_string();
        assert!(AuthService::new(&cfg).verify_token(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut cfg = Config::for_tests().auth;
        cfg.expires_in_hours = -2;
        let auth = AuthService::new(&cfg);
        let token = auth.issue_token(&user()).unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let auth = AuthService::new(&Config::for_tests().auth);
        let hash = auth.hash_password("hunter22").await.unwrap();
        assert!(auth.verify_password("hunter22", &hash).await.unwrap());
        assert!(!auth.verify_password("hunter23", &hash).await.unwrap());
    }
}
