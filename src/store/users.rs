use async_trait::async_trait;
use chrono::Utc;
use std::sync::RwLock;
use thiserror::Error;

use crate::database::Database;
use crate::models::{User, UserId};

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user store lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, UserStoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, UserStoreError> {
        let mut users = self.users.write().map_err(|_| UserStoreError::Poisoned)?;
        if users.iter().any(|u| u.username == username) {
            return Err(UserStoreError::UsernameTaken(username.to_string()));
        }

        let user = User {
            id: UserId(users.len() as i64 + 1),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
        let users = self.users.read().map_err(|_| UserStoreError::Poisoned)?;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    db: Database,
}

impl PgUserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, UserStoreError> {
        let res = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash)
             VALUES ($1, $2)
             RETURNING id, username, password_hash, created_at",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.db.pool)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(UserStoreError::UsernameTaken(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(user)
    }
}
