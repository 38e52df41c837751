use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::{keeper::ConnectionKeeper, Connector, SharedConn};

/// Opens pools against the configured database URL.
pub struct PgConnector {
    url: Secret<String>,
    max_connections: u32,
    acquire_timeout: Duration,
}

impl PgConnector {
    pub fn new(url: Secret<String>, max_connections: u32) -> Self {
        Self {
            url,
            max_connections,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Conn = PgPool;

    async fn connect(&self) -> anyhow::Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(self.url.expose_secret())
            .await
            .context("connect to database")
    }

    async fn ping(&self, pool: &PgPool) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .context("ping database")?;
        Ok(())
    }

    async fn close(&self, pool: &PgPool) {
        pool.close().await;
    }
}

/// Connects, applies migrations and returns the keeper that owns the pool.
pub async fn open(
    connector: PgConnector,
    poll_interval: Duration,
) -> anyhow::Result<ConnectionKeeper<PgConnector>> {
    let pool = connector.connect().await?;
    connector.ping(&pool).await?;

    info!("running database migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("run migrations")?;

    Ok(ConnectionKeeper::new(
        connector,
        SharedConn::new(pool),
        poll_interval,
    ))
}
