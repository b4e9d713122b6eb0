//! Server-side cart, one set of lines per session.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{Cart, CartItem, ProductId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: ProductId,
    nom: String,
    prix: Decimal,
    prix_texte: Option<String>,
    image: Option<String>,
    quantite: i32,
}

impl From<CartLineRow> for CartItem {
    fn from(row: CartLineRow) -> Self {
        Self {
            sous_total: Self::subtotal(row.prix, row.quantite),
            product_id: row.product_id,
            nom: row.nom,
            prix: row.prix,
            prix_texte: row.prix_texte,
            image: row.image,
            quantite: row.quantite,
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add `quantite` of a product; an existing line is incremented.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(
        &self,
        session_id: &str,
        product_id: &ProductId,
        quantite: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cart_items (session_id, product_id, quantite)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id, product_id) DO UPDATE SET
                quantite = cart_items.quantite + EXCLUDED.quantite,
                updated_at = NOW()
            ",
        )
        .bind(session_id)
        .bind(product_id)
        .bind(quantite)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::from_missing_parent)?;

        Ok(())
    }

    /// Cart of a session with product details and totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, session_id: &str) -> Result<Cart, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT c.product_id, p.nom, p.prix, p.prix_texte, p.image, c.quantite
            FROM cart_items c
            JOIN products p ON p.product_id = c.product_id
            WHERE c.session_id = $1
            ORDER BY c.added_at
            ",
        )
        .bind(session_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Cart::from_items(rows.into_iter().map(CartItem::from).collect()))
    }

    /// Set the quantity of a line. A quantity of zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(
        &self,
        session_id: &str,
        product_id: &ProductId,
        quantite: i32,
    ) -> Result<(), RepositoryError> {
        if quantite <= 0 {
            return self.remove(session_id, product_id).await;
        }

        let result = sqlx::query(
            r"
            UPDATE cart_items SET quantite = $3, updated_at = NOW()
            WHERE session_id = $1 AND product_id = $2
            ",
        )
        .bind(session_id)
        .bind(product_id)
        .bind(quantite)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, session_id: &str, product_id: &ProductId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM cart_items WHERE session_id = $1 AND product_id = $2")
                .bind(session_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Empty a session's cart. Returns the number of lines removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, session_id: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
            .bind(session_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
