//! Schema migrations for the credential store

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::{error, info};

/// Apply pending migrations from `migrations/`
///
/// # Arguments
/// * `pool` - PostgreSQL connection pool
pub async fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    info!("Running credential store migrations");

    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        error!("Migration failed: {}", e);
        DatabaseError::Migration(e.to_string())
    })?;

    info!("Credential store migrations applied");
    Ok(())
}
