//! Product interaction tracking.

use marketplace_core::TrackEvent;

use super::{ApiClient, MessageEnvelope};
use crate::error::ClientError;

impl ApiClient {
    /// Record a product interaction.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] without sending anything when
    /// `product_id` or `event_type` is missing.
    pub async fn track_event(&self, event: &TrackEvent) -> Result<(), ClientError> {
        let missing = |field: Option<&String>| field.is_none_or(|value| value.trim().is_empty());
        if missing(event.product_id.as_ref()) || missing(event.event_type.as_ref()) {
            return Err(ClientError::Validation(
                "product_id et event_type sont requis".to_owned(),
            ));
        }

        let _: MessageEnvelope = self
            .post(self.marketplace_url(&["track-event"])?, event)
            .await?;
        Ok(())
    }
}
