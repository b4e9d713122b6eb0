//! Product repository: the published catalog.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::instrument;

use marketplace_core::{
    Product, ProductId, ProductQuery, ProductStatus, ProductWrite, ValidationAction, slugify,
};

use super::{RepositoryError, clamp_limit};

/// Largest page a caller may ask for. Without a limit the whole match is
/// returned.
const MAX_PAGE_SIZE: u32 = 500;
/// Channel recorded for products published through the API.
const SOURCE_CHANNEL: &str = "web";

const PRODUCT_COLUMNS: &str = r"
    p.product_id, p.nom, p.description_seo, p.meta_description, p.mots_cles,
    p.prix, p.prix_texte, p.image, p.lien, p.categorie, p.marque, p.note,
    p.remise, p.source, p.validation_score, p.validated, p.niche_score,
    p.niche_level, p.status, p.created_at, p.updated_at, p.published_at,
    p.source_channel, p.user_id, p.session_id, p.features
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    product_id: ProductId,
    nom: String,
    description_seo: Option<String>,
    meta_description: Option<String>,
    mots_cles: Option<String>,
    prix: Decimal,
    prix_texte: Option<String>,
    image: Option<String>,
    lien: Option<String>,
    categorie: Option<String>,
    marque: Option<String>,
    note: Option<String>,
    remise: Option<String>,
    source: Option<String>,
    validation_score: Option<i32>,
    validated: bool,
    niche_score: Option<f64>,
    niche_level: Option<String>,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    source_channel: Option<String>,
    user_id: Option<String>,
    session_id: Option<String>,
    features: Value,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            product_id: row.product_id,
            nom: row.nom,
            description_seo: row.description_seo,
            meta_description: row.meta_description,
            mots_cles: row.mots_cles,
            prix: row.prix,
            prix_texte: row.prix_texte,
            image: row.image,
            lien: row.lien,
            categorie: row.categorie,
            marque: row.marque,
            note: row.note,
            remise: row.remise,
            source: row.source,
            validation_score: row.validation_score,
            validated: row.validated,
            niche_score: row.niche_score,
            niche_level: row.niche_level,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            published_at: row.published_at,
            source_channel: row.source_channel,
            user_id: row.user_id,
            session_id: row.session_id,
            features: row.features,
        }
    }
}

/// Who published a product, recorded alongside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishContext<'c> {
    pub user_id: Option<&'c str>,
    pub session_id: Option<&'c str>,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product, or refresh it if `product_id` is already known.
    ///
    /// A new product is active and published now. A known one only gets its
    /// fields refreshed: its status, publication date and publisher stay as
    /// they were, so republishing never brings back an inactive or archived
    /// product. Categories are linked, creating unknown ones on the way.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, write, context), fields(product_id = %product_id))]
    pub async fn upsert(
        &self,
        product_id: &ProductId,
        write: &ProductWrite,
        context: PublishContext<'_>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO products (
                product_id, nom, description_seo, meta_description, mots_cles,
                prix, prix_texte, image, lien, categorie, marque, note, remise, source,
                validation_score, validated, niche_score, niche_level,
                status, published_at, source_channel, user_id, session_id, features
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, 'active', NOW(), $19, $20, $21, $22
            )
            ON CONFLICT (product_id) DO UPDATE SET
                nom = EXCLUDED.nom,
                description_seo = EXCLUDED.description_seo,
                meta_description = EXCLUDED.meta_description,
                mots_cles = EXCLUDED.mots_cles,
                prix = EXCLUDED.prix,
                prix_texte = EXCLUDED.prix_texte,
                image = EXCLUDED.image,
                lien = EXCLUDED.lien,
                categorie = EXCLUDED.categorie,
                marque = EXCLUDED.marque,
                note = EXCLUDED.note,
                remise = EXCLUDED.remise,
                source = EXCLUDED.source,
                validation_score = EXCLUDED.validation_score,
                validated = EXCLUDED.validated,
                niche_score = EXCLUDED.niche_score,
                niche_level = EXCLUDED.niche_level,
                updated_at = NOW(),
                features = EXCLUDED.features
            ",
        )
        .bind(product_id)
        .bind(&write.nom)
        .bind(&write.description_seo)
        .bind(&write.meta_description)
        .bind(&write.mots_cles)
        .bind(write.prix)
        .bind(&write.prix_texte)
        .bind(&write.image)
        .bind(&write.lien)
        .bind(&write.categorie)
        .bind(&write.marque)
        .bind(&write.note)
        .bind(&write.remise)
        .bind(&write.source)
        .bind(write.validation_score)
        .bind(write.validated)
        .bind(write.niche_score)
        .bind(&write.niche_level)
        .bind(SOURCE_CHANNEL)
        .bind(context.user_id)
        .bind(context.session_id)
        .bind(&write.features)
        .execute(&mut *tx)
        .await?;

        link_categories(&mut tx, product_id, &category_names(write)).await?;

        tx.commit().await?;
        Ok(())
    }

    /// List products with optional filters, newest publication first.
    ///
    /// Returns the page and the total number of matching products. Without a
    /// `limit` every match from `offset` on is returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ProductQuery) -> Result<(Vec<Product>, u64), RepositoryError> {
        let offset = i64::try_from(query.offset.unwrap_or(0)).unwrap_or(i64::MAX);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p WHERE TRUE");
        push_filters(&mut count, query);
        let (total,): (i64,) = count.build_query_as().fetch_one(self.pool).await?;

        let rows: Vec<ProductRow> = select_page(query, offset)
            .build_query_as()
            .fetch_all(self.pool)
            .await?;

        Ok((
            rows.into_iter().map(Product::from).collect(),
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get(&self, product_id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.product_id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Overwrite the editable fields of an existing product.
    ///
    /// Status and publication date are left as they are.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, write), fields(product_id = %product_id))]
    pub async fn update(
        &self,
        product_id: &ProductId,
        write: &ProductWrite,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE products SET
                nom = $2,
                description_seo = COALESCE($3, description_seo),
                meta_description = COALESCE($4, meta_description),
                mots_cles = COALESCE($5, mots_cles),
                prix = $6,
                prix_texte = $7,
                image = $8,
                lien = $9,
                categorie = $10,
                marque = $11,
                note = $12,
                remise = $13,
                source = $14,
                validation_score = COALESCE($15, validation_score),
                niche_score = COALESCE($16, niche_score),
                niche_level = COALESCE($17, niche_level),
                updated_at = NOW()
            WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .bind(&write.nom)
        .bind(&write.description_seo)
        .bind(&write.meta_description)
        .bind(&write.mots_cles)
        .bind(write.prix)
        .bind(&write.prix_texte)
        .bind(&write.image)
        .bind(&write.lien)
        .bind(&write.categorie)
        .bind(&write.marque)
        .bind(&write.note)
        .bind(&write.remise)
        .bind(&write.source)
        .bind(write.validation_score)
        .bind(write.niche_score)
        .bind(&write.niche_level)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let names = category_names(write);
        if !names.is_empty() {
            sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
            link_categories(&mut tx, product_id, &names).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Set the status of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %product_id, status = %status))]
    pub async fn set_status(
        &self,
        product_id: &ProductId,
        status: ProductStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET status = $2, updated_at = NOW() WHERE product_id = $1",
        )
        .bind(product_id)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Approve or reject a draft.
    ///
    /// Publishing marks the product validated and stamps its publication
    /// date; rejecting archives it. Returns the resulting status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn validate(
        &self,
        product_id: &ProductId,
        action: ValidationAction,
    ) -> Result<ProductStatus, RepositoryError> {
        let status = action.resulting_status();
        let publish = action == ValidationAction::Publish;

        let result = sqlx::query(
            r"
            UPDATE products SET
                status = $2,
                validated = CASE WHEN $3 THEN TRUE ELSE validated END,
                published_at = CASE WHEN $3 THEN NOW() ELSE published_at END,
                updated_at = NOW()
            WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .bind(status)
        .bind(publish)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(status)
    }

    /// Delete a product with its category links, events and cart lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete(&self, product_id: &ProductId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for table in ["product_categories", "product_events", "cart_items"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE product_id = $1"))
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Products waiting for approval, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn drafts(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             WHERE p.status = 'draft' ORDER BY p.created_at DESC"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Active products of a category, best validated first.
    ///
    /// `categorie` matches the stored category text, or a linked category by
    /// name or slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn by_category(
        &self,
        categorie: &str,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            WHERE p.status = 'active'
              AND (
                p.categorie = $1
                OR EXISTS (
                    SELECT 1 FROM product_categories pc
                    JOIN categories c ON c.id = pc.category_id
                    WHERE pc.product_id = p.product_id
                      AND (c.nom = $1 OR c.slug = $1)
                )
              )
            ORDER BY p.validation_score DESC NULLS LAST, p.published_at DESC NULLS LAST
            LIMIT $2
            "
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(categorie)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Record the public path of a downloaded image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_image(&self, product_id: &ProductId, image: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE products SET image = $2, updated_at = NOW() WHERE product_id = $1")
            .bind(product_id)
            .bind(image)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// Category names a write should be linked to.
fn category_names(write: &ProductWrite) -> Vec<String> {
    if write.categories.is_empty() {
        write
            .categorie
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    } else {
        write.categories.clone()
    }
}

/// The listing query for `query`, starting at `offset`.
fn select_page(query: &ProductQuery, offset: i64) -> QueryBuilder<'static, Postgres> {
    let mut select = QueryBuilder::<Postgres>::new("SELECT ");
    select.push(PRODUCT_COLUMNS);
    select.push(" FROM products p WHERE TRUE");
    push_filters(&mut select, query);
    select.push(" ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC");
    if let Some(limit) = query.limit {
        select.push(" LIMIT ");
        select.push_bind(clamp_limit(limit, MAX_PAGE_SIZE));
    }
    select.push(" OFFSET ");
    select.push_bind(offset);
    select
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    if let Some(status) = query.status {
        builder.push(" AND p.status = ");
        builder.push_bind(status);
    }
    if let Some(categorie) = query.categorie.as_deref().filter(|c| !c.is_empty()) {
        builder.push(" AND p.categorie = ");
        builder.push_bind(categorie.to_owned());
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        builder.push(" AND (p.nom ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.description_seo ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.meta_description ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.mots_cles ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

/// Link a product to categories by name, creating unknown ones.
async fn link_categories(
    tx: &mut Transaction<'_, Postgres>,
    product_id: &ProductId,
    names: &[String],
) -> Result<(), RepositoryError> {
    for name in names {
        sqlx::query("INSERT INTO categories (nom, slug) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(name)
            .bind(slugify(name))
            .execute(&mut **tx)
            .await?;

        let category_id: Option<(i32,)> = sqlx::query_as("SELECT id FROM categories WHERE nom = $1")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;

        let Some((category_id,)) = category_id else {
            tracing::warn!(category = %name, "Category slug already taken, link skipped");
            continue;
        };

        sqlx::query(
            r"
            INSERT INTO product_categories (product_id, category_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(product_id)
        .bind(category_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
