//! Sales journal: boutiques and the sales recorded against them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{BoutiqueId, SaleId};
use super::price::{decimal_number, opt_decimal_number};

/// Name of the boutique created by the initial migration.
pub const DEFAULT_BOUTIQUE: &str = "Boutique Principale";
/// Wire format of sale dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Number of rows in each "top" ranking of the statistics.
pub const TOP_LIMIT: i64 = 10;

/// Errors from date handling in the sales journal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("Format de date invalide: {0}. Utilisez YYYY-MM-DD")]
    InvalidFormat(String),
    #[error("Mois invalide: {0}")]
    InvalidMonth(u32),
    #[error("Année invalide: {0}")]
    InvalidYear(i32),
}

/// Parse a `YYYY-MM-DD` sale date.
///
/// # Errors
///
/// Returns [`DateError::InvalidFormat`] for anything else.
pub fn parse_sale_date(value: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| DateError::InvalidFormat(value.to_owned()))
}

/// Inclusive date range for a year, or for one month of it.
///
/// A month runs from its first day to the first day of the next month,
/// except December which ends on the 31st. Month `0` means the whole year.
///
/// # Errors
///
/// Returns [`DateError`] for a month above 12 or an unrepresentable year.
pub fn period_bounds(year: i32, month: Option<u32>) -> Result<(NaiveDate, NaiveDate), DateError> {
    let date = |y: i32, m: u32, d: u32| {
        NaiveDate::from_ymd_opt(y, m, d).ok_or(DateError::InvalidYear(year))
    };

    match month {
        None | Some(0) => Ok((date(year, 1, 1)?, date(year, 12, 31)?)),
        Some(12) => Ok((date(year, 12, 1)?, date(year, 12, 31)?)),
        Some(m @ 1..=11) => Ok((date(year, m, 1)?, date(year, m + 1, 1)?)),
        Some(other) => Err(DateError::InvalidMonth(other)),
    }
}

/// A shop whose sales are tracked in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boutique {
    pub id: BoutiqueId,
    pub nom: String,
    pub description: Option<String>,
    pub adresse: Option<String>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body for creating or replacing a boutique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoutiqueInput {
    pub nom: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub adresse: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

/// A recorded sale, with its boutique name and computed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub boutique_id: BoutiqueId,
    pub boutique_nom: Option<String>,
    pub date_vente: NaiveDate,
    pub produit_nom: String,
    #[serde(with = "decimal_number")]
    pub prix: Decimal,
    pub quantite: i32,
    pub localisation: Option<String>,
    pub client_info: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `prix × quantite`.
    #[serde(with = "decimal_number")]
    pub total: Decimal,
}

impl Sale {
    /// Sale total for a unit price and a quantity.
    #[must_use]
    pub fn compute_total(prix: Decimal, quantite: i32) -> Decimal {
        prix * Decimal::from(quantite)
    }
}

fn default_quantity() -> i32 {
    1
}

/// Body for recording a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleInput {
    pub boutique_id: BoutiqueId,
    /// `YYYY-MM-DD`; validated by [`SaleInput::sale_date`].
    pub date_vente: String,
    pub produit_nom: String,
    #[serde(with = "decimal_number")]
    pub prix: Decimal,
    #[serde(default = "default_quantity")]
    pub quantite: i32,
    #[serde(default)]
    pub localisation: Option<String>,
    #[serde(default)]
    pub client_info: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SaleInput {
    /// The parsed sale date.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::InvalidFormat`] when `date_vente` is not `YYYY-MM-DD`.
    pub fn sale_date(&self) -> Result<NaiveDate, DateError> {
        parse_sale_date(&self.date_vente)
    }
}

/// Partial update of a sale; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boutique_id: Option<BoutiqueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_vente: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produit_nom: Option<String>,
    #[serde(
        default,
        with = "opt_decimal_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub prix: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantite: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localisation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SaleUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.boutique_id.is_none()
            && self.date_vente.is_none()
            && self.produit_nom.is_none()
            && self.prix.is_none()
            && self.quantite.is_none()
            && self.localisation.is_none()
            && self.client_info.is_none()
            && self.notes.is_none()
    }

    /// The parsed new sale date, if one is given.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::InvalidFormat`] for a malformed date.
    pub fn sale_date(&self) -> Result<Option<NaiveDate>, DateError> {
        self.date_vente
            .as_deref()
            .filter(|date| !date.is_empty())
            .map(parse_sale_date)
            .transpose()
    }
}

/// Filters for listing sales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boutique_id: Option<BoutiqueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_debut: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_fin: Option<NaiveDate>,
    /// Case-insensitive substring match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produit_nom: Option<String>,
    /// Case-insensitive substring match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localisation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl SaleFilter {
    /// Filter covering a year or one month of it.
    ///
    /// # Errors
    ///
    /// See [`period_bounds`].
    pub fn for_period(
        year: i32,
        month: Option<u32>,
        boutique_id: Option<BoutiqueId>,
    ) -> Result<Self, DateError> {
        let (start, end) = period_bounds(year, month)?;
        Ok(Self {
            boutique_id,
            date_debut: Some(start),
            date_fin: Some(end),
            ..Self::default()
        })
    }
}

/// A product's contribution to revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub produit: String,
    #[serde(with = "decimal_number")]
    pub ca: Decimal,
    pub quantite: i64,
}

/// A location's contribution to revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopLocation {
    pub localisation: String,
    #[serde(with = "decimal_number")]
    pub ca: Decimal,
    pub nb_ventes: i64,
}

/// Aggregated sales figures over a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesStats {
    pub nb_ventes: i64,
    /// Revenue (`Σ prix × quantite`).
    #[serde(with = "decimal_number")]
    pub ca_total: Decimal,
    #[serde(with = "decimal_number")]
    pub prix_moyen: Decimal,
    pub quantite_totale: i64,
    pub top_produits: Vec<TopProduct>,
    pub top_localisations: Vec<TopLocation>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            period_bounds(2025, Some(3)).unwrap(),
            (ymd(2025, 3, 1), ymd(2025, 4, 1))
        );
    }

    #[test]
    fn test_december_ends_on_31st() {
        assert_eq!(
            period_bounds(2024, Some(12)).unwrap(),
            (ymd(2024, 12, 1), ymd(2024, 12, 31))
        );
    }

    #[test]
    fn test_whole_year_bounds() {
        assert_eq!(
            period_bounds(2024, None).unwrap(),
            (ymd(2024, 1, 1), ymd(2024, 12, 31))
        );
    }

    #[test]
    fn test_invalid_month() {
        assert_eq!(period_bounds(2024, Some(13)), Err(DateError::InvalidMonth(13)));
    }

    #[test]
    fn test_month_zero_is_whole_year() {
        assert_eq!(
            period_bounds(2024, Some(0)).unwrap(),
            (ymd(2024, 1, 1), ymd(2024, 12, 31))
        );
    }

    #[test]
    fn test_parse_sale_date() {
        assert_eq!(parse_sale_date("2025-02-28").unwrap(), ymd(2025, 2, 28));
        let err = parse_sale_date("28/02/2025").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Format de date invalide: 28/02/2025. Utilisez YYYY-MM-DD"
        );
        assert!(parse_sale_date("2025-02-30").is_err());
    }

    #[test]
    fn test_sale_input_defaults_quantity() {
        let input: SaleInput = serde_json::from_value(json!({
            "boutique_id": 1,
            "date_vente": "2025-05-01",
            "produit_nom": "Tissu wax",
            "prix": 7500
        }))
        .unwrap();
        assert_eq!(input.quantite, 1);
        assert_eq!(input.sale_date().unwrap(), ymd(2025, 5, 1));
    }

    #[test]
    fn test_total() {
        assert_eq!(
            Sale::compute_total(Decimal::from(2500), 3),
            Decimal::from(7500)
        );
    }

    #[test]
    fn test_update_emptiness() {
        assert!(SaleUpdate::default().is_empty());
        let update = SaleUpdate {
            notes: Some(String::new()),
            ..SaleUpdate::default()
        };
        assert!(!update.is_empty());
        assert_eq!(update.sale_date().unwrap(), None);
    }

    #[test]
    fn test_period_filter() {
        let filter = SaleFilter::for_period(2025, Some(6), Some(BoutiqueId::new(2))).unwrap();
        assert_eq!(filter.date_debut, Some(ymd(2025, 6, 1)));
        assert_eq!(filter.date_fin, Some(ymd(2025, 7, 1)));
        assert_eq!(filter.boutique_id, Some(BoutiqueId::new(2)));
    }
}
