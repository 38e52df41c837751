use std::{str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use secrecy::Secret;

use crate::store::keeper::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown STORE_BACKEND '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub keepalive_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub database: Option<DatabaseConfig>,
    pub jwt_secret: Secret<String>,
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let backend = get("STORE_BACKEND")
            .map(|v| v.parse::<StoreBackend>())
            .transpose()?
            .unwrap_or(StoreBackend::Postgres);

        let database = match backend {
            StoreBackend::Memory => None,
            StoreBackend::Postgres => {
                let url = get("DATABASE_URL")
                    .or_else(|| get("PG_URL"))
                    .context("DATABASE_URL must be set for the postgres backend")?;
                Some(DatabaseConfig {
                    url: Secret::new(url),
                    max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
                    keepalive_interval: nonzero_secs(
                        &get,
                        "KEEPALIVE_INTERVAL_SECS",
                        DEFAULT_POLL_INTERVAL,
                    )?,
                })
            }
        };

        Ok(Self {
            backend,
            database,
            jwt_secret: Secret::new(get("JWT_SECRET").context("JWT_SECRET must be set")?),
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "APP_PORT", 8080)?,
            request_timeout: nonzero_secs(&get, "REQUEST_TIMEOUT_SECS", Duration::from_secs(30))?,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => v.parse().with_context(|| format!("invalid {key}")),
        None => Ok(default),
    }
}

/// Whole seconds; zero is rejected since both the keeper ticker and the
/// request timeout need a positive period.
fn nonzero_secs(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    let secs = parse_or(get, key, default.as_secs())?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(Duration::from_secs(secs))
}

/// Default `EnvFilter` directive for a `LOG_LEVEL` value.
pub fn log_filter(level: Option<&str>) -> String {
    let level = match level.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("err") | Some("error") => "error",
        Some("trace") => "trace",
        _ => "info",
    };
    format!("nickauth={level},axum=info,tower_http=info")
}
