//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! authentic-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `AUTHENTIC_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/api/migrations/` and are embedded at build time.

use authentic_api::db;

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    db::migrate(&pool).await?;
    tracing::info!("Migrations complete!");

    pool.close().await;
    Ok(())
}
