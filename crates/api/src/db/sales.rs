//! Sales journal repository.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use marketplace_core::{
    BoutiqueId, Sale, SaleFilter, SaleId, SaleInput, SaleUpdate, SalesStats, TOP_LIMIT,
    TopLocation, TopProduct,
};

use super::RepositoryError;

const SALE_SELECT: &str = r"
    SELECT s.id, s.boutique_id, b.nom AS boutique_nom, s.date_vente, s.produit_nom,
           s.prix, s.quantite, s.localisation, s.client_info, s.notes, s.created_at
    FROM sales s
    LEFT JOIN boutiques b ON b.id = s.boutique_id
    WHERE TRUE
";

#[derive(sqlx::FromRow)]
struct SaleRow {
    id: SaleId,
    boutique_id: BoutiqueId,
    boutique_nom: Option<String>,
    date_vente: NaiveDate,
    produit_nom: String,
    prix: Decimal,
    quantite: i32,
    localisation: Option<String>,
    client_info: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Self {
            total: Self::compute_total(row.prix, row.quantite),
            id: row.id,
            boutique_id: row.boutique_id,
            boutique_nom: row.boutique_nom,
            date_vente: row.date_vente,
            produit_nom: row.produit_nom,
            prix: row.prix,
            quantite: row.quantite,
            localisation: row.localisation,
            client_info: row.client_info,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TotalsRow {
    nb_ventes: i64,
    ca_total: Decimal,
    prix_moyen: Decimal,
    quantite_totale: i64,
}

#[derive(sqlx::FromRow)]
struct TopProductRow {
    produit: String,
    ca: Decimal,
    quantite: i64,
}

#[derive(sqlx::FromRow)]
struct TopLocationRow {
    localisation: String,
    ca: Decimal,
    nb_ventes: i64,
}

/// Repository for sales journal database operations.
pub struct SaleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SaleRepository<'a> {
    /// Create a new sale repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a sale. The caller has already validated the date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, input), fields(boutique_id = %input.boutique_id))]
    pub async fn create(
        &self,
        input: &SaleInput,
        date_vente: NaiveDate,
    ) -> Result<Sale, RepositoryError> {
        let (id,): (SaleId,) = sqlx::query_as(
            r"
            INSERT INTO sales
                (boutique_id, date_vente, produit_nom, prix, quantite, localisation, client_info, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(input.boutique_id)
        .bind(date_vente)
        .bind(&input.produit_nom)
        .bind(input.prix)
        .bind(input.quantite)
        .bind(&input.localisation)
        .bind(&input.client_info)
        .bind(&input.notes)
        .fetch_one(self.pool)
        .await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Sales matching `filter`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new(SALE_SELECT);
        push_filters(&mut builder, filter);
        builder.push(" ORDER BY s.date_vente DESC, s.id DESC");
        if let Some(limit) = filter.limit.filter(|limit| *limit > 0) {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let rows: Vec<SaleRow> = builder.build_query_as().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Sale::from).collect())
    }

    /// Get a sale by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new(SALE_SELECT);
        builder.push(" AND s.id = ");
        builder.push_bind(id);

        let row: Option<SaleRow> = builder.build_query_as().fetch_optional(self.pool).await?;
        Ok(row.map(Sale::from))
    }

    /// Apply the fields present in `update`.
    ///
    /// Returns `false` when there was nothing to change.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the sale does not exist.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: SaleId,
        update: &SaleUpdate,
        date_vente: Option<NaiveDate>,
    ) -> Result<bool, RepositoryError> {
        let without_date = SaleUpdate {
            date_vente: None,
            ..update.clone()
        };
        if without_date.is_empty() && date_vente.is_none() {
            return Ok(false);
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE sales SET ");
        let mut fields = builder.separated(", ");
        if let Some(boutique_id) = update.boutique_id {
            fields.push("boutique_id = ").push_bind_unseparated(boutique_id);
        }
        if let Some(date) = date_vente {
            fields.push("date_vente = ").push_bind_unseparated(date);
        }
        if let Some(produit_nom) = &update.produit_nom {
            fields.push("produit_nom = ").push_bind_unseparated(produit_nom.clone());
        }
        if let Some(prix) = update.prix {
            fields.push("prix = ").push_bind_unseparated(prix);
        }
        if let Some(quantite) = update.quantite {
            fields.push("quantite = ").push_bind_unseparated(quantite);
        }
        if let Some(localisation) = &update.localisation {
            fields.push("localisation = ").push_bind_unseparated(localisation.clone());
        }
        if let Some(client_info) = &update.client_info {
            fields.push("client_info = ").push_bind_unseparated(client_info.clone());
        }
        if let Some(notes) = &update.notes {
            fields.push("notes = ").push_bind_unseparated(notes.clone());
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(true)
    }

    /// Delete a sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the sale does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: SaleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Totals and top products/locations for the sales matching `filter`.
    ///
    /// `filter.limit` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn stats(&self, filter: &SaleFilter) -> Result<SalesStats, RepositoryError> {
        let mut totals = QueryBuilder::<Postgres>::new(
            r"
            SELECT COUNT(*) AS nb_ventes,
                   COALESCE(SUM(s.prix * s.quantite), 0) AS ca_total,
                   COALESCE(AVG(s.prix), 0) AS prix_moyen,
                   COALESCE(SUM(s.quantite), 0)::bigint AS quantite_totale
            FROM sales s
            WHERE TRUE
            ",
        );
        push_filters(&mut totals, filter);
        let totals: TotalsRow = totals.build_query_as().fetch_one(self.pool).await?;

        let mut products = QueryBuilder::<Postgres>::new(
            r"
            SELECT s.produit_nom AS produit,
                   SUM(s.prix * s.quantite) AS ca,
                   SUM(s.quantite)::bigint AS quantite
            FROM sales s
            WHERE TRUE
            ",
        );
        push_filters(&mut products, filter);
        products.push(" GROUP BY s.produit_nom ORDER BY ca DESC LIMIT ");
        products.push_bind(TOP_LIMIT);
        let top_produits: Vec<TopProductRow> =
            products.build_query_as().fetch_all(self.pool).await?;

        let mut locations = QueryBuilder::<Postgres>::new(
            r"
            SELECT s.localisation AS localisation,
                   SUM(s.prix * s.quantite) AS ca,
                   COUNT(*) AS nb_ventes
            FROM sales s
            WHERE s.localisation IS NOT NULL AND s.localisation <> ''
            ",
        );
        push_filters(&mut locations, filter);
        locations.push(" GROUP BY s.localisation ORDER BY ca DESC LIMIT ");
        locations.push_bind(TOP_LIMIT);
        let top_localisations: Vec<TopLocationRow> =
            locations.build_query_as().fetch_all(self.pool).await?;

        Ok(SalesStats {
            nb_ventes: totals.nb_ventes,
            ca_total: totals.ca_total,
            prix_moyen: totals.prix_moyen.round_dp(2),
            quantite_totale: totals.quantite_totale,
            top_produits: top_produits
                .into_iter()
                .map(|row| TopProduct {
                    produit: row.produit,
                    ca: row.ca,
                    quantite: row.quantite,
                })
                .collect(),
            top_localisations: top_localisations
                .into_iter()
                .map(|row| TopLocation {
                    localisation: row.localisation,
                    ca: row.ca,
                    nb_ventes: row.nb_ventes,
                })
                .collect(),
        })
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &SaleFilter) {
    if let Some(boutique_id) = filter.boutique_id {
        builder.push(" AND s.boutique_id = ");
        builder.push_bind(boutique_id);
    }
    if let Some(start) = filter.date_debut {
        builder.push(" AND s.date_vente >= ");
        builder.push_bind(start);
    }
    if let Some(end) = filter.date_fin {
        builder.push(" AND s.date_vente <= ");
        builder.push_bind(end);
    }
    if let Some(produit_nom) = filter.produit_nom.as_deref().filter(|p| !p.is_empty()) {
        builder.push(" AND s.produit_nom ILIKE ");
        builder.push_bind(format!("%{produit_nom}%"));
    }
    if let Some(localisation) = filter.localisation.as_deref().filter(|l| !l.is_empty()) {
        builder.push(" AND s.localisation ILIKE ");
        builder.push_bind(format!("%{localisation}%"));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_period_filter_sql() {
        let filter = SaleFilter::for_period(2025, Some(3), Some(BoutiqueId::new(1))).unwrap();
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM sales s WHERE TRUE");
        push_filters(&mut builder, &filter);
        assert_eq!(
            builder.sql(),
            "SELECT 1 FROM sales s WHERE TRUE AND s.boutique_id = $1 \
             AND s.date_vente >= $2 AND s.date_vente <= $3"
        );
    }

    #[test]
    fn test_text_filters_use_ilike() {
        let filter = SaleFilter {
            produit_nom: Some("wax".to_owned()),
            localisation: Some("Dakar".to_owned()),
            ..SaleFilter::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM sales s WHERE TRUE");
        push_filters(&mut builder, &filter);
        let sql = builder.sql();
        assert!(sql.contains("s.produit_nom ILIKE $1"));
        assert!(sql.contains("s.localisation ILIKE $2"));
    }
}
