use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        customer_id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL UNIQUE,
        phone VARCHAR(20) NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS addresses (
        address_id BIGSERIAL PRIMARY KEY,
        customer_id BIGINT NOT NULL REFERENCES customers (customer_id) ON DELETE CASCADE,
        line1 VARCHAR(255) NOT NULL,
        area VARCHAR(255),
        city VARCHAR(100) NOT NULL,
        pincode VARCHAR(20) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_addresses_customer_id ON addresses (customer_id)",
];

/// Connection settings for [`Database::connect`].
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub connect_retries: u32,
    pub retry_delay: Duration,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_retries: 10,
            retry_delay: Duration::from_secs(5),
        }
    }
}

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Connects, retrying while the database is still starting, then ensures the schema.
    pub async fn connect(database_url: &str, options: &DatabaseOptions) -> anyhow::Result<Self> {
        let attempts = options.connect_retries.max(1);
        let mut attempt = 1;

        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(options.max_connections)
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Database connection failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempt,
                        attempts,
                        e,
                        options.retry_delay
                    );
                    attempt += 1;
                    tokio::time::sleep(options.retry_delay).await;
                }
                Err(e) => {
                    return Err(anyhow::anyhow!(
                        "could not connect to database after {} attempts: {}",
                        attempts,
                        e
                    ))
                }
            }
        };

        sqlx::query("SELECT 1").execute(&pool).await?;
        ensure_schema(&pool).await?;
        tracing::info!("Database schema verified");

        Ok(Self { pool })
    }
}

/// Creates the customers and addresses tables when missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await
}
