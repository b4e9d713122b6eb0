//! Server cart endpoints, keyed by session id.

use serde::{Deserialize, Serialize};

use marketplace_core::{AddToCart, Cart, ProductId, UpdateCart};

use super::{ApiClient, MessageEnvelope};
use crate::error::ClientError;

#[derive(Serialize)]
struct SessionQuery<'a> {
    session_id: &'a str,
}

#[derive(Deserialize)]
struct CartEnvelope {
    #[serde(flatten)]
    cart: Cart,
}

impl ApiClient {
    /// The cart of `session_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn cart(&self, session_id: &str) -> Result<Cart, ClientError> {
        let envelope: CartEnvelope = self
            .get_query(self.marketplace_url(&["cart"])?, &SessionQuery { session_id })
            .await?;
        Ok(envelope.cart)
    }

    /// Add a product, or increase its quantity when already in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a quantity below one and
    /// [`ClientError::NotFound`] for an unknown product.
    pub async fn add_to_cart(&self, item: &AddToCart) -> Result<String, ClientError> {
        if item.quantite <= 0 {
            return Err(ClientError::Validation(
                "La quantité doit être positive".to_owned(),
            ));
        }
        let envelope: MessageEnvelope = self
            .post(self.marketplace_url(&["cart", "add"])?, item)
            .await?;
        Ok(envelope.message)
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the product is not in the cart.
    pub async fn update_cart(&self, item: &UpdateCart) -> Result<String, ClientError> {
        let envelope: MessageEnvelope = self
            .put(self.marketplace_url(&["cart", "update"])?, item)
            .await?;
        Ok(envelope.message)
    }

    /// Remove one product from the cart.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] when the product is not in the cart.
    pub async fn remove_from_cart(
        &self,
        session_id: &str,
        product_id: &ProductId,
    ) -> Result<(), ClientError> {
        let mut url = self.marketplace_url(&["cart", product_id.as_str()])?;
        url.query_pairs_mut().append_pair("session_id", session_id);
        let _: MessageEnvelope = self.delete(url).await?;
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn clear_cart(&self, session_id: &str) -> Result<(), ClientError> {
        let mut url = self.marketplace_url(&["cart"])?;
        url.query_pairs_mut().append_pair("session_id", session_id);
        let _: MessageEnvelope = self.delete(url).await?;
        Ok(())
    }
}
