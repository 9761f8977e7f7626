//! Notes API Server

use anyhow::Context;
use clap::Parser;
use notes_api::{create_router, state::AppState};
use notes_core::{AppConfig, LoggingConfig, PgStore, SecretSource};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "notes-api", version, about = "Notes REST API server")]
struct Args {
    /// TOML configuration file; environment variables override it
    #[arg(short, long, env = "NOTES_CONFIG")]
    config: Option<PathBuf>,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json_format {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => AppConfig::from_file(path.clone())?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = match config.database.url.clone() {
        Some(url) => {
            let store = PgStore::connect(&url, config.database.max_connections)
                .await
                .context("Failed to connect to database")?;
            store.migrate().await.context("Failed to prepare schema")?;
            tracing::info!("Using PostgreSQL store");
            AppState::with_postgres(config, store)?
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            AppState::in_memory(config)?
        }
    };

    if state.jwt.secret_source() == SecretSource::DevelopmentDefault {
        tracing::warn!(
            "JWT_SECRET not set, signing tokens with the development default; \
             set JWT_REQUIRE_SECRET=true to refuse this"
        );
    }

    // Create router
    let app = create_router(Arc::new(state));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Notes API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
