//! Category endpoints.

use serde::{Deserialize, Serialize};

use marketplace_core::{Category, FeaturedCategory, Product};

use super::ApiClient;
use crate::error::ClientError;

#[derive(Deserialize)]
struct CategoriesEnvelope<T> {
    categories: Vec<T>,
}

#[derive(Deserialize)]
struct ProductsEnvelope {
    produits: Vec<Product>,
}

#[derive(Serialize)]
struct LimitQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl ApiClient {
    /// All categories, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        let envelope: CategoriesEnvelope<Category> =
            self.get(self.marketplace_url(&["categories"])?).await?;
        Ok(envelope.categories)
    }

    /// Active products of a category. The API defaults `limit` to 4.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn category_products(
        &self,
        categorie: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Product>, ClientError> {
        let envelope: ProductsEnvelope = self
            .get_query(
                self.marketplace_url(&["categories", categorie, "produits"])?,
                &LimitQuery { limit },
            )
            .await?;
        Ok(envelope.produits)
    }

    /// Categories ranked for the home page. The API defaults `limit` to 6.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn featured_categories(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<FeaturedCategory>, ClientError> {
        let envelope: CategoriesEnvelope<FeaturedCategory> = self
            .get_query(
                self.marketplace_url(&["categories-phares"])?,
                &LimitQuery { limit },
            )
            .await?;
        Ok(envelope.categories)
    }
}
