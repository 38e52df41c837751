use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record as persisted in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub role: String,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    #[serde(skip_serializing, default)]
    #[sqlx(rename = "password")]
    pub password_hash: String, // argon2 PHC string, never plaintext
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BackendUnavailable(String),
    #[error("{0}")]
    Unknown(String),
}

/// Row-level access to users. Absence is `Ok(None)`, never an error.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    /// Nicknames are unique, so at most one row matches.
    async fn get_by_nickname(&self, nickname: &str) -> Result<Option<User>, RepoError>;

    /// Inserts a user whose `id` is already assigned.
    async fn create(&self, user: &User) -> Result<User, RepoError>;

    /// Full-row replace by id; `None` if no row matched.
    async fn update(&self, user: &User) -> Result<Option<User>, RepoError>;

    /// Idempotent: deleting a missing row is not an error.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    async fn get_password_hash(&self, id: Uuid) -> Result<Option<String>, RepoError>;
}
