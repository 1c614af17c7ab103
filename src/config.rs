use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::db::DatabaseOptions;

/// Which [`CustomerRepository`](crate::repository::CustomerRepository) backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_retries: u32,
    pub db_retry_delay: Duration,
    pub seed_file: Option<PathBuf>,
    pub max_body_bytes: usize,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "customer-service".to_string(),
            port: 8000,
            storage: StorageBackend::Memory,
            database_url: None,
            db_max_connections: 10,
            db_connect_retries: 10,
            db_retry_delay: Duration::from_secs(5),
            seed_file: None,
            max_body_bytes: crate::routes::DEFAULT_MAX_BODY_BYTES,
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", name, raw)),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage = match std::env::var("STORAGE_BACKEND") {
            Ok(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => StorageBackend::Postgres,
        };

        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("DB_URL"))
            .ok()
            .filter(|url| !url.trim().is_empty());

        if storage == StorageBackend::Postgres {
            match &database_url {
                None => anyhow::bail!("DATABASE_URL or DB_URL environment variable required"),
                Some(url) if !url.starts_with("postgresql://") && !url.starts_with("postgres://") => {
                    anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://")
                }
                Some(_) => {}
            }
        }

        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let defaults = Config::default();
        let config = Self {
            service_name: std::env::var("SERVICE_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.service_name),
            port: parse_var("PORT", defaults.port)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            storage,
            database_url,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_connect_retries: parse_var("DB_CONNECT_RETRIES", defaults.db_connect_retries)?,
            db_retry_delay: Duration::from_secs(parse_var(
                "DB_RETRY_DELAY_SECS",
                defaults.db_retry_delay.as_secs(),
            )?),
            seed_file: std::env::var("SEED_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.max_body_bytes)?,
            log_format,
        };

        // Log successful configuration load (without sensitive values)
        tracing::debug!("Storage backend: {:?}", config.storage);
        tracing::debug!("Server Port: {}", config.port);
        if let Some(ref seed) = config.seed_file {
            tracing::debug!("Seed file: {}", seed.display());
        }

        Ok(config)
    }

    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions {
            max_connections: self.db_max_connections,
            connect_retries: self.db_connect_retries,
            retry_delay: self.db_retry_delay,
        }
    }
}
