use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{config::DatabaseConfig, error::Result};

/// Connects and brings the schema up to date before the server takes traffic.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await?;

    let migrator = sqlx::migrate!();
    migrator.run(&pool).await?;

    tracing::info!(
        "Database ready: {} migration(s) known, pool of {} connections",
        migrator.iter().count(),
        config.max_connections
    );

    Ok(pool)
}

pub async fn check_health(pool: &PgPool) -> Result<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
