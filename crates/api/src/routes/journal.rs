//! Sales journal route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketplace_core::{
    BoutiqueId, DateError, Sale, SaleFilter, SaleId, SaleInput, SaleUpdate, SalesStats,
    parse_sale_date,
};

use crate::db::{BoutiqueRepository, SaleRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::{ApiJson, ApiPath, ApiQuery};

const NOT_FOUND: &str = "Vente non trouvée";

/// Listing filters as sent on the query string. Dates stay strings so a bad
/// one is reported with the journal's own message.
#[derive(Debug, Default, Deserialize)]
pub struct SaleListQuery {
    pub boutique_id: Option<i32>,
    pub date_debut: Option<String>,
    pub date_fin: Option<String>,
    pub produit_nom: Option<String>,
    pub localisation: Option<String>,
    pub limit: Option<i64>,
}

impl SaleListQuery {
    fn to_filter(&self) -> std::result::Result<SaleFilter, DateError> {
        Ok(SaleFilter {
            boutique_id: self.boutique_id.map(BoutiqueId::new),
            date_debut: parse_optional(self.date_debut.as_deref())?,
            date_fin: parse_optional(self.date_fin.as_deref())?,
            produit_nom: non_blank(self.produit_nom.as_deref()),
            localisation: non_blank(self.localisation.as_deref()),
            limit: self.limit.filter(|limit| *limit > 0),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub mois: Option<u32>,
    pub boutique_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SalesResponse {
    pub success: bool,
    pub ventes: Vec<Sale>,
    pub count: usize,
}

impl SalesResponse {
    fn new(ventes: Vec<Sale>) -> Json<Self> {
        Json(Self {
            success: true,
            count: ventes.len(),
            ventes,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub success: bool,
    pub vente: Sale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub statistiques: SalesStats,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: &'static str,
}

#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SaleListQuery>,
) -> Result<Json<SalesResponse>> {
    let ventes = SaleRepository::new(state.pool())
        .list(&query.to_filter()?)
        .await?;
    Ok(SalesResponse::new(ventes))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<SaleResponse>> {
    let vente = SaleRepository::new(state.pool())
        .get(SaleId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))?;

    Ok(Json(SaleResponse {
        success: true,
        vente,
        message: None,
    }))
}

/// Record a sale. The date must be `YYYY-MM-DD` and the boutique must exist.
#[instrument(skip(state, input), fields(boutique_id = %input.boutique_id))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SaleInput>,
) -> Result<Json<SaleResponse>> {
    let date_vente = input.sale_date()?;
    if input.produit_nom.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Le nom du produit est obligatoire".to_owned(),
        ));
    }
    require_boutique(&state, input.boutique_id).await?;

    let vente = SaleRepository::new(state.pool())
        .create(&input, date_vente)
        .await?;
    tracing::info!(sale_id = %vente.id, total = %vente.total, "Sale recorded");

    Ok(Json(SaleResponse {
        success: true,
        vente,
        message: Some("Vente enregistrée avec succès"),
    }))
}

/// Apply a partial update and return the sale as stored.
#[instrument(skip(state, update))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(update): ApiJson<SaleUpdate>,
) -> Result<Json<SaleResponse>> {
    let date_vente = update.sale_date()?;
    if let Some(boutique_id) = update.boutique_id {
        require_boutique(&state, boutique_id).await?;
    }

    let id = SaleId::new(id);
    let repo = SaleRepository::new(state.pool());
    let changed = repo
        .update(id, &update, date_vente)
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_FOUND))?;

    let vente = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))?;

    Ok(Json(SaleResponse {
        success: true,
        vente,
        message: Some(if changed {
            "Vente modifiée avec succès"
        } else {
            "Aucune modification"
        }),
    }))
}

#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<DeletedResponse>> {
    SaleRepository::new(state.pool())
        .delete(SaleId::new(id))
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_FOUND))?;

    Ok(Json(DeletedResponse {
        success: true,
        message: "Vente supprimée avec succès",
    }))
}

/// Totals and rankings over the filtered sales.
#[instrument(skip(state))]
pub async fn statistics(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SaleListQuery>,
) -> Result<Json<StatsResponse>> {
    let statistiques = SaleRepository::new(state.pool())
        .stats(&query.to_filter()?)
        .await?;

    Ok(Json(StatsResponse {
        success: true,
        statistiques,
    }))
}

/// Sales of a year, or of one month of it.
#[instrument(skip(state))]
pub async fn period(
    State(state): State<AppState>,
    ApiPath(annee): ApiPath<i32>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> Result<Json<SalesResponse>> {
    let filter = SaleFilter::for_period(annee, query.mois, query.boutique_id.map(BoutiqueId::new))?;
    let ventes = SaleRepository::new(state.pool()).list(&filter).await?;
    Ok(SalesResponse::new(ventes))
}

async fn require_boutique(state: &AppState, id: BoutiqueId) -> Result<()> {
    if BoutiqueRepository::new(state.pool()).get(id).await?.is_none() {
        return Err(AppError::BadRequest(format!(
            "Boutique avec l'ID {id} n'existe pas"
        )));
    }
    Ok(())
}

fn parse_optional(value: Option<&str>) -> std::result::Result<Option<chrono::NaiveDate>, DateError> {
    value
        .filter(|date| !date.trim().is_empty())
        .map(parse_sale_date)
        .transpose()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_query_to_filter() {
        let query = SaleListQuery {
            boutique_id: Some(2),
            date_debut: Some("2025-01-01".to_owned()),
            date_fin: Some(String::new()),
            produit_nom: Some("  ".to_owned()),
            localisation: Some("Dakar".to_owned()),
            limit: Some(0),
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.boutique_id, Some(BoutiqueId::new(2)));
        assert_eq!(filter.date_debut, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filter.date_fin, None);
        assert_eq!(filter.produit_nom, None);
        assert_eq!(filter.localisation.as_deref(), Some("Dakar"));
        assert_eq!(filter.limit, None);
    }

    #[test]
    fn test_bad_date_is_a_bad_request() {
        let query = SaleListQuery {
            date_fin: Some("31/12/2025".to_owned()),
            ..SaleListQuery::default()
        };
        let err: AppError = query.to_filter().unwrap_err().into();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("YYYY-MM-DD")));
    }
}
