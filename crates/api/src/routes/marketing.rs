//! SEO generation, forwarded to the main backend.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

use super::ApiJson;

const UNAVAILABLE: &str = "Service de génération SEO temporairement indisponible";

#[derive(Debug, Deserialize)]
pub struct SeoRequest {
    #[serde(default)]
    pub texte_produit: String,
}

/// Generate SEO copy for a product description.
///
/// The backend's answer is returned as is. Any failure to reach it is a 503.
#[instrument(skip(state, body))]
pub async fn generate_seo(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SeoRequest>,
) -> Result<Json<Value>> {
    if body.texte_produit.trim().is_empty() {
        return Err(AppError::BadRequest(
            "texte_produit est requis".to_owned(),
        ));
    }

    add_breadcrumb("seo", "Generating SEO copy", &[]);

    let generated = state
        .backend()
        .generate_seo(&body.texte_produit)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "SEO generation failed");
            AppError::ServiceUnavailable(UNAVAILABLE.to_owned())
        })?;

    Ok(Json(generated))
}
