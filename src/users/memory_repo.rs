use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{RepoError, User, UserRepository};

/// Process-local user store; nickname uniqueness is enforced by a secondary index.
#[derive(Default, Clone)]
pub struct InMemoryUserRepository {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    nicknames: HashMap<String, Uuid>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_by_nickname(&self, nickname: &str) -> Result<Option<User>, RepoError> {
        let tables = self.inner.read().await;
        Ok(tables
            .nicknames
            .get(nickname)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<User, RepoError> {
        let mut tables = self.inner.write().await;
        if tables.users.contains_key(&user.id) {
            return Err(RepoError::Conflict(format!(
                "User with ID '{}' already exists",
                user.id
            )));
        }
        if tables.nicknames.contains_key(&user.nickname) {
            return Err(RepoError::Conflict(format!(
                "Nickname '{}' already exists",
                user.nickname
            )));
        }
        tables.nicknames.insert(user.nickname.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<Option<User>, RepoError> {
        let mut tables = self.inner.write().await;
        let old_nickname = match tables.users.get(&user.id) {
            Some(old) => old.nickname.clone(),
            None => return Ok(None),
        };
        if old_nickname != user.nickname {
            if tables.nicknames.contains_key(&user.nickname) {
                return Err(RepoError::Conflict(format!(
                    "Nickname '{}' already exists",
                    user.nickname
                )));
            }
            tables.nicknames.remove(&old_nickname);
            tables.nicknames.insert(user.nickname.clone(), user.id);
        }
        tables.users.insert(user.id, user.clone());
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.inner.write().await;
        if let Some(user) = tables.users.remove(&id) {
            tables.nicknames.remove(&user.nickname);
        }
        Ok(())
    }

    async fn get_password_hash(&self, id: Uuid) -> Result<Option<String>, RepoError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .get(&id)
            .map(|u| u.password_hash.clone()))
    }
}
