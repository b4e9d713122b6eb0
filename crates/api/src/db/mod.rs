//! Database operations for the marketplace `PostgreSQL`.
//!
//! ## Tables
//!
//! - `products` - Published catalog (upserted by `product_id`)
//! - `categories` - Browsable categories, seven seeded by migration
//! - `product_categories` - Product/category links
//! - `product_events` - View/click/cart/purchase tracking
//! - `cart_items` - Server-side cart lines per session
//! - `boutiques` - Shops of the sales journal
//! - `sales` - Sales journal entries
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p marketplace-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`query_as` + `FromRow` rows) so the crate
//! builds without a database.

pub mod boutiques;
pub mod cart;
pub mod categories;
pub mod events;
pub mod products;
pub mod sales;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use boutiques::BoutiqueRepository;
pub use cart::CartRepository;
pub use categories::CategoryRepository;
pub use events::{EventRepository, NewEvent};
pub use products::{ProductRepository, PublishContext};
pub use sales::SaleRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique boutique name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to `Conflict`, everything else to `Database`.
    pub(crate) fn from_unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }

    /// Map foreign key violations to `NotFound`, everything else to `Database`.
    pub(crate) fn from_missing_parent(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return Self::NotFound;
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Clamp a caller-supplied limit into `1..=max`.
pub(crate) fn clamp_limit(limit: u32, max: u32) -> i64 {
    i64::from(limit.clamp(1, max))
}
