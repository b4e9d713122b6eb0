//! Server-side cart route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketplace_core::{AddToCart, Cart, EventType, ProductId, UpdateCart};

use crate::db::{CartRepository, EventRepository, NewEvent};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::{ApiJson, ApiPath, ApiQuery};

/// Source recorded on events emitted by the cart.
const EVENT_SOURCE: &str = "web";

const NOT_IN_CART: &str = "Produit non trouvé dans le panier";

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(flatten)]
    pub cart: Cart,
}

#[derive(Debug, Serialize)]
pub struct CartMessage {
    pub success: bool,
    pub message: &'static str,
}

impl CartMessage {
    const fn ok(message: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

/// Cart of a session with its total.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SessionQuery>,
) -> Result<Json<CartResponse>> {
    let session_id = require_session(query.session_id.as_deref())?;
    let cart = CartRepository::new(state.pool()).get(session_id).await?;

    Ok(Json(CartResponse {
        success: true,
        cart,
    }))
}

/// Add a product, incrementing an existing line.
#[instrument(skip(state, body), fields(product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AddToCart>,
) -> Result<Json<CartMessage>> {
    let session_id = require_session(Some(&body.session_id))?;
    if body.quantite <= 0 {
        return Err(AppError::BadRequest(
            "La quantité doit être positive".to_owned(),
        ));
    }

    CartRepository::new(state.pool())
        .add(session_id, &body.product_id, body.quantite)
        .await
        .map_err(|e| AppError::not_found_as(e, "Produit non trouvé"))?;

    let event = NewEvent {
        session_id: Some(session_id.to_owned()),
        source: Some(EVENT_SOURCE.to_owned()),
        ..NewEvent::new(body.product_id.clone(), EventType::AddToCart)
    };
    if let Err(e) = EventRepository::new(state.pool()).record(&event).await {
        tracing::warn!(error = %e, "Failed to record add_to_cart event");
    }

    Ok(CartMessage::ok("Produit ajouté au panier"))
}

/// Set the quantity of a line. Zero or less removes it.
#[instrument(skip(state, body), fields(product_id = %body.product_id))]
pub async fn update(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdateCart>,
) -> Result<Json<CartMessage>> {
    let session_id = require_session(Some(&body.session_id))?;

    CartRepository::new(state.pool())
        .set_quantity(session_id, &body.product_id, body.quantite)
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_IN_CART))?;

    Ok(CartMessage::ok("Quantité mise à jour"))
}

/// Remove a line.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<SessionQuery>,
) -> Result<Json<CartMessage>> {
    let session_id = require_session(query.session_id.as_deref())?;

    CartRepository::new(state.pool())
        .remove(session_id, &ProductId::new(product_id))
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_IN_CART))?;

    Ok(CartMessage::ok("Produit retiré du panier"))
}

/// Empty the cart of a session.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SessionQuery>,
) -> Result<Json<CartMessage>> {
    let session_id = require_session(query.session_id.as_deref())?;
    let removed = CartRepository::new(state.pool()).clear(session_id).await?;
    tracing::debug!(removed, "Cart cleared");

    Ok(CartMessage::ok("Panier vidé"))
}

fn require_session(session_id: Option<&str>) -> Result<&str> {
    session_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("session_id est requis".to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_is_required() {
        assert!(require_session(None).is_err());
        assert!(require_session(Some("   ")).is_err());
        assert_eq!(require_session(Some(" session_1 ")).unwrap(), "session_1");
    }
}
