//! Postgres pool for the layout repository

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::Config;

/// Connect the pool; migrations are run by the binary
pub async fn init_database(config: &Config) -> Result<PgPool> {
    let database = &config.database;
    info!(
        max_connections = database.max_connections,
        min_connections = database.min_connections,
        "Connecting to layout database"
    );

    let pool = pool_options(database)
        .connect(config.database_url())
        .await
        .context("Layout database connection failed")?;

    info!("Layout database connected");
    Ok(pool)
}

fn pool_options(database: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(database.max_connections)
        .min_connections(database.min_connections.min(database.max_connections))
        .acquire_timeout(Duration::from_secs(database.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(database.idle_timeout_seconds))
}
