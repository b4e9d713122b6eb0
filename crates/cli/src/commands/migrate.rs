//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! mkt migrate
//! ```
//!
//! # Environment Variables
//!
//! - `MARKETPLACE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/api/migrations/` and are embedded at build time.

use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

fn database_url() -> Result<String, MigrationError> {
    std::env::var("MARKETPLACE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("MARKETPLACE_DATABASE_URL"))
}

/// Run the marketplace database migrations.
///
/// # Errors
///
/// Returns error if the database URL is missing, the connection fails or a
/// migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to marketplace database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running marketplace migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Marketplace migrations complete!");
    Ok(())
}
