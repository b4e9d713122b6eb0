//! Product event repository.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{DeviceType, EventId, EventType, ProductEvent, ProductId};

use super::RepositoryError;

/// An event about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub product_id: ProductId,
    pub event_type: EventType,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub device_type: Option<DeviceType>,
    pub source: Option<String>,
    pub metadata: Option<Value>,
}

impl NewEvent {
    /// An event with no context attached.
    #[must_use]
    pub const fn new(product_id: ProductId, event_type: EventType) -> Self {
        Self {
            product_id,
            event_type,
            user_id: None,
            session_id: None,
            device_type: None,
            source: None,
            metadata: None,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: EventId,
    product_id: ProductId,
    event_type: EventType,
    user_id: Option<String>,
    session_id: Option<String>,
    device_type: Option<DeviceType>,
    source: Option<String>,
    occurred_at: DateTime<Utc>,
    metadata: Option<Value>,
}

impl From<EventRow> for ProductEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            event_type: row.event_type,
            user_id: row.user_id,
            session_id: row.session_id,
            device_type: row.device_type,
            source: row.source,
            timestamp: row.occurred_at,
            metadata: row.metadata,
        }
    }
}

/// Repository for product event database operations.
pub struct EventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepository<'a> {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record an event.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, event), fields(product_id = %event.product_id, event_type = %event.event_type))]
    pub async fn record(&self, event: &NewEvent) -> Result<ProductEvent, RepositoryError> {
        let row = sqlx::query_as::<_, EventRow>(
            r"
            INSERT INTO product_events
                (product_id, event_type, user_id, session_id, device_type, source, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, product_id, event_type, user_id, session_id, device_type,
                      source, occurred_at, metadata
            ",
        )
        .bind(&event.product_id)
        .bind(event.event_type)
        .bind(&event.user_id)
        .bind(&event.session_id)
        .bind(event.device_type)
        .bind(&event.source)
        .bind(&event.metadata)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_missing_parent)?;

        Ok(row.into())
    }
}
