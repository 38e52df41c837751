use std::sync::Arc;

use tokio::sync::watch;

mod app;
mod auth;
mod config;
mod error;
mod state;
mod store;
mod users;

use crate::{
    config::{AppConfig, StoreBackend},
    state::AppState,
    store::postgres::{self, PgConnector},
    users::{memory_repo::InMemoryUserRepository, pg_repo::PgUserRepository, repo::UserRepository},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| config::log_filter(std::env::var("LOG_LEVEL").ok().as_deref()));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (repo, keeper_task) = match (&config.backend, &config.database) {
        (StoreBackend::Postgres, Some(db)) => {
            let connector = PgConnector::new(db.url.clone(), db.max_connections);
            let keeper = postgres::open(connector, db.keepalive_interval).await?;
            let repo = PgUserRepository::new(keeper.handle());
            (Arc::new(repo) as Arc<dyn UserRepository>, Some(keeper.spawn(shutdown_rx)))
        }
        (StoreBackend::Postgres, None) => anyhow::bail!("postgres backend requires DATABASE_URL"),
        (StoreBackend::Memory, _) => {
            tracing::warn!("using in-memory user store; data is lost on exit");
            (Arc::new(InMemoryUserRepository::new()) as Arc<dyn UserRepository>, None)
        }
    };
    tracing::info!(backend = ?config.backend, "user store ready");

    let app_state = AppState::new(config.clone(), repo);
    let app = app::build_app(app_state);
    let served = app::serve(app, &config.host, config.port).await;

    // Stop the keeper whether or not the server exited cleanly.
    let _ = shutdown_tx.send(true);
    if let Some(task) = keeper_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "connection keeper task failed");
        }
    }

    served
}
