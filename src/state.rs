use std::sync::Arc;

use axum::extract::FromRef;
use secrecy::ExposeSecret;

use crate::{
    auth::jwt::JwtKeys,
    config::AppConfig,
    users::{repo::UserRepository, service::UserService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub users: UserService,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, repo: Arc<dyn UserRepository>) -> Self {
        let keys = JwtKeys::new(config.jwt_secret.expose_secret().as_bytes());
        let users = UserService::new(repo, keys.clone());
        Self {
            config,
            keys,
            users,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::{config::StoreBackend, users::memory_repo::InMemoryUserRepository};
        use secrecy::Secret;

        let config = Arc::new(AppConfig {
            backend: StoreBackend::Memory,
            database: None,
            jwt_secret: Secret::new("test-secret".into()),
            host: "127.0.0.1".into(),
            port: 0,
            request_timeout: std::time::Duration::from_secs(5),
        });
        Self::new(config, Arc::new(InMemoryUserRepository::new()))
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}
