use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use customer_service::config::{Config, LogFormat, StorageBackend};
use customer_service::db::Database;
use customer_service::db_storage::PgCustomerRepository;
use customer_service::handlers::AppState;
use customer_service::memory_storage::InMemoryCustomerRepository;
use customer_service::repository::CustomerRepository;
use customer_service::{metrics, routes, seed};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "customer_service=debug,tower_http=debug".into());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

/// Main entry point for the service.
///
/// Initializes logging, configuration, storage (with optional seeding), the
/// metrics recorder and the HTTP router, then serves until a shutdown signal.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    tracing::info!("Configuration loaded successfully");

    let repo: Arc<dyn CustomerRepository> = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for postgres storage"))?;
            let db = Database::connect(url, &config.database_options()).await?;
            tracing::info!("Database connection pool established");
            Arc::new(PgCustomerRepository::new(db.pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(InMemoryCustomerRepository::new())
        }
    };

    if let Some(path) = &config.seed_file {
        let records = seed::load_seed_file(path).await?;
        seed::seed_if_empty(repo.as_ref(), &records)
            .await
            .map_err(|e| anyhow::anyhow!("seeding failed: {}", e))?;
    }

    let app_state = Arc::new(AppState {
        repo,
        service_name: config.service_name.clone(),
        metrics: metrics::install_recorder(),
    });

    let app = routes::build_router(app_state, config.max_body_bytes);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("{} listening on {}", config.service_name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
