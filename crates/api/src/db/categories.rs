//! Category repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{Category, CategoryId, FeaturedCategory, round_score};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    nom: String,
    slug: String,
    description: Option<String>,
    icone: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            nom: row.nom,
            slug: row.slug,
            description: row.description,
            icone: row.icone,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FeaturedRow {
    nom: String,
    nombre_produits: i64,
    score_moyen: Option<f64>,
    produits_valides: i64,
    derniere_publication: Option<DateTime<Utc>>,
}

impl From<FeaturedRow> for FeaturedCategory {
    fn from(row: FeaturedRow) -> Self {
        Self {
            nom: row.nom,
            nombre_produits: row.nombre_produits,
            score_moyen: round_score(row.score_moyen.unwrap_or_default()),
            produits_valides: row.produits_valides,
            derniere_publication: row.derniere_publication,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, nom, slug, description, icone FROM categories ORDER BY nom",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Categories of active products, ranked for the home page.
    ///
    /// Ranked by validated products, mean validation score, product count,
    /// then most recent publication.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn featured(&self, limit: i64) -> Result<Vec<FeaturedCategory>, RepositoryError> {
        let rows = sqlx::query_as::<_, FeaturedRow>(
            r"
            SELECT
                categorie AS nom,
                COUNT(*) AS nombre_produits,
                AVG(COALESCE(validation_score, 0))::float8 AS score_moyen,
                COUNT(*) FILTER (WHERE validated) AS produits_valides,
                MAX(published_at) AS derniere_publication
            FROM products
            WHERE status = 'active'
              AND categorie IS NOT NULL
              AND categorie <> ''
            GROUP BY categorie
            ORDER BY
                produits_valides DESC,
                score_moyen DESC,
                nombre_produits DESC,
                derniere_publication DESC NULLS LAST
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FeaturedCategory::from).collect())
    }
}
