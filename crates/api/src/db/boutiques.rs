//! Boutique repository for the sales journal.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{Boutique, BoutiqueId, BoutiqueInput};

use super::RepositoryError;

const DUPLICATE_NAME: &str = "Une boutique avec ce nom existe déjà";

#[derive(sqlx::FromRow)]
struct BoutiqueRow {
    id: BoutiqueId,
    nom: String,
    description: Option<String>,
    adresse: Option<String>,
    contact: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<BoutiqueRow> for Boutique {
    fn from(row: BoutiqueRow) -> Self {
        Self {
            id: row.id,
            nom: row.nom,
            description: row.description,
            adresse: row.adresse,
            contact: row.contact,
            created_at: row.created_at,
        }
    }
}

/// Repository for boutique database operations.
pub struct BoutiqueRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BoutiqueRepository<'a> {
    /// Create a new boutique repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All boutiques ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Boutique>, RepositoryError> {
        let rows = sqlx::query_as::<_, BoutiqueRow>(
            "SELECT id, nom, description, adresse, contact, created_at FROM boutiques ORDER BY nom",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Boutique::from).collect())
    }

    /// Get a boutique by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: BoutiqueId) -> Result<Option<Boutique>, RepositoryError> {
        let row = sqlx::query_as::<_, BoutiqueRow>(
            "SELECT id, nom, description, adresse, contact, created_at FROM boutiques WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Boutique::from))
    }

    /// Create a boutique.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, input), fields(nom = %input.nom))]
    pub async fn create(&self, input: &BoutiqueInput) -> Result<Boutique, RepositoryError> {
        let row = sqlx::query_as::<_, BoutiqueRow>(
            r"
            INSERT INTO boutiques (nom, description, adresse, contact)
            VALUES ($1, $2, $3, $4)
            RETURNING id, nom, description, adresse, contact, created_at
            ",
        )
        .bind(input.nom.trim())
        .bind(&input.description)
        .bind(&input.adresse)
        .bind(&input.contact)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, DUPLICATE_NAME))?;

        Ok(row.into())
    }

    /// Replace a boutique's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the boutique does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: BoutiqueId,
        input: &BoutiqueInput,
    ) -> Result<Boutique, RepositoryError> {
        let row = sqlx::query_as::<_, BoutiqueRow>(
            r"
            UPDATE boutiques SET nom = $2, description = $3, adresse = $4, contact = $5
            WHERE id = $1
            RETURNING id, nom, description, adresse, contact, created_at
            ",
        )
        .bind(id)
        .bind(input.nom.trim())
        .bind(&input.description)
        .bind(&input.adresse)
        .bind(&input.contact)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, DUPLICATE_NAME))?;

        row.map(Boutique::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a boutique and, by cascade, its sales.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the boutique does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: BoutiqueId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM boutiques WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
