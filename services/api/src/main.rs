use std::net::SocketAddr;

use anyhow::Result;
use auth::jwt::{JwtConfig, JwtService};
use auth::repositories::PgUserRepository;
use common::database::{DatabaseConfig, connect_with_retry};
use media::{Storage, StorageConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod middleware;
mod routes;
mod state;


use crate::{config::ServerConfig, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load()?;
    error::expose_error_details(!config.is_production());
    info!(
        "Starting API service in {} mode",
        if config.is_production() {
            "PRODUCTION"
        } else {
            "DEVELOPMENT"
        }
    );

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = connect_with_retry(&db_config).await;
    auth::database::run_migrations(&pool).await?;

    let jwt = JwtService::new(JwtConfig::from_env()?);

    let mut storage_config = StorageConfig::from_env()?;
    storage_config.public_prefix = format!("{}/file", config.api_base_url.trim_end_matches('/'));
    let storage = Storage::from_config(storage_config).await?;

    let port = config.port;
    let superadmin_password = config.superadmin_password.clone();
    let state = AppState::new(PgUserRepository::new(pool), jwt, storage, config);

    state
        .accounts
        .bootstrap_superadmin(&superadmin_password)
        .await?;

    // Start the web server
    let app = routes::create_router(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("API service listening on 0.0.0.0:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("API service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down API service");
}
