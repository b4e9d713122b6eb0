//! Product catalog endpoints.

use serde::{Deserialize, Serialize};

use marketplace_core::{
    Product, ProductId, ProductPage, ProductQuery, ProductStatus, PublishRequest,
    ValidationAction,
};

use super::{ApiClient, MessageEnvelope};
use crate::error::ClientError;

/// Result of publishing one product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishOutcome {
    pub product_id: ProductId,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub image_downloaded: bool,
}

/// Result of publishing a batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchPublishOutcome {
    pub product_ids: Vec<ProductId>,
    pub count: usize,
    #[serde(default)]
    pub images_downloaded: usize,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
struct ProductEnvelope {
    produit: Product,
}

#[derive(Deserialize)]
struct ProductsEnvelope {
    produits: Vec<Product>,
}

#[derive(Deserialize)]
struct UpdateEnvelope {
    product_id: ProductId,
}

#[derive(Deserialize)]
struct StatusEnvelope {
    status: ProductStatus,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    status: &'a str,
}

#[derive(Serialize)]
struct ActionQuery<'a> {
    action: &'a str,
}

impl ApiClient {
    /// One page of products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ClientError> {
        self.get_query(self.marketplace_url(&["products"])?, query)
            .await
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn product(&self, id: &ProductId) -> Result<Product, ClientError> {
        let envelope: ProductEnvelope = self
            .get(self.marketplace_url(&["products", id.as_str()])?)
            .await?;
        Ok(envelope.produit)
    }

    /// Products awaiting approval.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn draft_products(&self) -> Result<Vec<Product>, ClientError> {
        let envelope: ProductsEnvelope = self
            .get(self.marketplace_url(&["products", "drafts"])?)
            .await?;
        Ok(envelope.produits)
    }

    /// Publish (or refresh) a product.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] without sending anything when the
    /// name or the price is missing.
    pub async fn publish_product(
        &self,
        request: &PublishRequest,
    ) -> Result<PublishOutcome, ClientError> {
        request.validate()?;
        self.post(self.marketplace_url(&["publish-product"])?, request)
            .await
    }

    /// Publish a batch of products in one call. The body is the bare array.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] without sending anything when any
    /// product is invalid.
    pub async fn publish_products(
        &self,
        requests: &[PublishRequest],
    ) -> Result<BatchPublishOutcome, ClientError> {
        for request in requests {
            request.validate()?;
        }
        self.post(
            self.marketplace_url(&["publish-products-batch"])?,
            requests,
        )
        .await
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an invalid payload and
    /// [`ClientError::NotFound`] for an unknown id.
    pub async fn update_product(
        &self,
        id: &ProductId,
        request: &PublishRequest,
    ) -> Result<ProductId, ClientError> {
        request.validate()?;
        let envelope: UpdateEnvelope = self
            .put(self.marketplace_url(&["products", id.as_str()])?, request)
            .await?;
        Ok(envelope.product_id)
    }

    /// Change a product's status.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn set_product_status(
        &self,
        id: &ProductId,
        status: ProductStatus,
    ) -> Result<ProductStatus, ClientError> {
        tracing::debug!(product_id = %id, %status, "Changing product status");
        let envelope: StatusEnvelope = self
            .patch(
                self.marketplace_url(&["products", id.as_str(), "status"])?,
                &StatusBody {
                    status: status.as_str(),
                },
            )
            .await?;
        Ok(envelope.status)
    }

    /// Approve or reject a draft.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn validate_product(
        &self,
        id: &ProductId,
        action: ValidationAction,
    ) -> Result<String, ClientError> {
        let envelope: MessageEnvelope = self
            .post_query(
                self.marketplace_url(&["products", id.as_str(), "validate"])?,
                &ActionQuery {
                    action: action.as_str(),
                },
            )
            .await?;
        Ok(envelope.message)
    }

    /// Delete a product with its category links and events.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ClientError> {
        let _: MessageEnvelope = self
            .delete(self.marketplace_url(&["products", id.as_str()])?)
            .await?;
        Ok(())
    }
}
