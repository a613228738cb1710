//! LibraryFlow Server - Library Circulation Manager
//!
//! REST API server over the catalog, roster and lending ledger.

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use libraryflow_server::{
    api,
    clock::SystemClock,
    config::{AppConfig, StorageBackend},
    repository::{MemoryStore, PgStore, Repository},
    services::{LendingPolicy, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("libraryflow_server={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting LibraryFlow Server v{}", env!("CARGO_PKG_VERSION"));

    let repository: Repository = match config.storage.backend {
        StorageBackend::Postgres => {
            // Create database connection pool
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await?;

            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations").run(&pool).await?;

            tracing::info!("Database migrations completed");

            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let policy = LendingPolicy::new(config.lending.clone());
    tracing::info!(
        loan_term_days = config.lending.loan_term_days,
        fine_per_day = %config.lending.fine_per_day,
        max_open_loans = config.lending.max_open_loans,
        "Lending policy loaded"
    );

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let services = Services::new(repository, Arc::new(SystemClock::new()), policy);

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = api::create_router(state);

    // Start server
    let addr = SocketAddr::new(server_host.parse()?, server_port);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
