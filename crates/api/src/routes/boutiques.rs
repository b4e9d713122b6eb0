//! Boutique route handlers for the sales journal.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use marketplace_core::{Boutique, BoutiqueId, BoutiqueInput};

use crate::db::BoutiqueRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::{ApiJson, ApiPath};

const NOT_FOUND: &str = "Boutique non trouvée";

#[derive(Debug, Serialize)]
pub struct BoutiquesResponse {
    pub success: bool,
    pub boutiques: Vec<Boutique>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct BoutiqueResponse {
    pub success: bool,
    pub boutique: Boutique,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: &'static str,
}

#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<BoutiquesResponse>> {
    let boutiques = BoutiqueRepository::new(state.pool()).list().await?;

    Ok(Json(BoutiquesResponse {
        success: true,
        count: boutiques.len(),
        boutiques,
    }))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<BoutiqueResponse>> {
    let boutique = BoutiqueRepository::new(state.pool())
        .get(BoutiqueId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))?;

    Ok(Json(BoutiqueResponse {
        success: true,
        boutique,
        message: None,
    }))
}

/// Create a boutique. A duplicate name is a 409.
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<BoutiqueInput>,
) -> Result<Json<BoutiqueResponse>> {
    require_name(&input)?;
    let boutique = BoutiqueRepository::new(state.pool()).create(&input).await?;
    tracing::info!(boutique_id = %boutique.id, nom = %boutique.nom, "Boutique created");

    Ok(Json(BoutiqueResponse {
        success: true,
        boutique,
        message: Some("Boutique créée avec succès"),
    }))
}

#[instrument(skip(state, input))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<BoutiqueInput>,
) -> Result<Json<BoutiqueResponse>> {
    require_name(&input)?;
    let boutique = BoutiqueRepository::new(state.pool())
        .update(BoutiqueId::new(id), &input)
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_FOUND))?;

    Ok(Json(BoutiqueResponse {
        success: true,
        boutique,
        message: Some("Boutique modifiée avec succès"),
    }))
}

/// Delete a boutique and its sales.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<DeletedResponse>> {
    BoutiqueRepository::new(state.pool())
        .delete(BoutiqueId::new(id))
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_FOUND))?;

    Ok(Json(DeletedResponse {
        success: true,
        message: "Boutique supprimée avec succès",
    }))
}

fn require_name(input: &BoutiqueInput) -> Result<()> {
    if input.nom.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Le nom de la boutique est obligatoire".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_is_rejected() {
        let input = BoutiqueInput {
            nom: "  ".to_owned(),
            description: None,
            adresse: None,
            contact: None,
        };
        assert!(matches!(require_name(&input), Err(AppError::BadRequest(_))));
    }
}
