//! Product event tracking.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use marketplace_core::{EventType, ProductId, TrackEvent};

use crate::db::{EventRepository, NewEvent};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::ApiJson;

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Record a view, click, cart or purchase event.
#[instrument(skip(state, body))]
pub async fn track(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TrackEvent>,
) -> Result<Json<TrackResponse>> {
    let event = to_new_event(body)?;

    EventRepository::new(state.pool())
        .record(&event)
        .await
        .map_err(|e| AppError::not_found_as(e, "Produit non trouvé"))?;

    tracing::debug!(
        product_id = %event.product_id,
        event_type = %event.event_type,
        "Event recorded"
    );

    Ok(Json(TrackResponse {
        success: true,
        message: "Événement enregistré avec succès",
    }))
}

/// Check the required fields. An unknown device type is dropped.
fn to_new_event(body: TrackEvent) -> Result<NewEvent> {
    let (Some(product_id), Some(event_type)) = (
        body.product_id.filter(|id| !id.trim().is_empty()),
        body.event_type.filter(|kind| !kind.trim().is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "product_id et event_type sont requis".to_owned(),
        ));
    };

    let event_type: EventType = event_type
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Type d'événement invalide: {event_type}")))?;

    Ok(NewEvent {
        device_type: body.device_type.and_then(|device| device.parse().ok()),
        user_id: body.user_id,
        session_id: body.session_id,
        source: body.source,
        metadata: body.metadata,
        ..NewEvent::new(ProductId::new(product_id), event_type)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marketplace_core::DeviceType;

    #[test]
    fn test_missing_fields_are_rejected() {
        let err = to_new_event(TrackEvent::default()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let body = TrackEvent {
            product_id: Some("p1".to_owned()),
            event_type: Some(String::new()),
            ..TrackEvent::default()
        };
        assert!(to_new_event(body).is_err());
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let body = TrackEvent {
            product_id: Some("p1".to_owned()),
            event_type: Some("like".to_owned()),
            ..TrackEvent::default()
        };
        let err = to_new_event(body).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("like")));
    }

    #[test]
    fn test_context_is_carried() {
        let body = TrackEvent {
            session_id: Some("session_1".to_owned()),
            device_type: Some("mobile".to_owned()),
            source: Some("search".to_owned()),
            ..TrackEvent::new(&ProductId::new("p1"), EventType::Click)
        };
        let event = to_new_event(body).unwrap();
        assert_eq!(event.product_id, ProductId::new("p1"));
        assert_eq!(event.event_type, EventType::Click);
        assert_eq!(event.device_type, Some(DeviceType::Mobile));
        assert_eq!(event.session_id.as_deref(), Some("session_1"));
        assert_eq!(event.source.as_deref(), Some("search"));
    }

    #[test]
    fn test_unknown_device_is_dropped() {
        let body = TrackEvent {
            device_type: Some("toaster".to_owned()),
            ..TrackEvent::new(&ProductId::new("p1"), EventType::View)
        };
        assert_eq!(to_new_event(body).unwrap().device_type, None);
    }
}
