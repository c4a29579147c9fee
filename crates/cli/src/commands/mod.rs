//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use authentic_api::config::{ConfigError, get_database_url};
use authentic_api::db::{self, Store};
use sqlx::PgPool;

/// Errors shared by commands that need the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the API database (`AUTHENTIC_DATABASE_URL` or `DATABASE_URL`).
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url("AUTHENTIC_DATABASE_URL")?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Connect and wrap the pool in a [`Store`].
pub async fn connect_store() -> Result<Store, ConnectError> {
    Ok(Store::postgres(connect().await?))
}
