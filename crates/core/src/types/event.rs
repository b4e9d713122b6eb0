//! Product interaction events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::{EventId, ProductId};
use super::status::{DeviceType, EventType};

/// A recorded interaction with a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEvent {
    pub id: EventId,
    pub product_id: ProductId,
    pub event_type: EventType,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub device_type: Option<DeviceType>,
    /// `direct`, `search`, `social`, `referral`, `web`...
    pub source: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<Value>,
}

/// Body of `POST /track-event`.
///
/// `product_id` and `event_type` are required but kept optional here so the
/// API can answer with its own error message instead of a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TrackEvent {
    /// Event of `event_type` on `product_id` with no context.
    #[must_use]
    pub fn new(product_id: &ProductId, event_type: EventType) -> Self {
        Self {
            product_id: Some(product_id.to_string()),
            event_type: Some(event_type.as_str().to_owned()),
            ..Self::default()
        }
    }
}
