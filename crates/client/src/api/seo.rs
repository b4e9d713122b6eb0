//! SEO copy generation, forwarded by the marketplace API.

use serde::Serialize;
use serde_json::Value;

use super::ApiClient;
use crate::error::ClientError;

#[derive(Serialize)]
struct SeoBody<'a> {
    texte_produit: &'a str,
}

impl ApiClient {
    /// Generate SEO copy for a product text. The answer is the backend's JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an empty text and
    /// [`ClientError::Api`] (503) when the generator is unavailable.
    pub async fn generate_seo(&self, texte_produit: &str) -> Result<Value, ClientError> {
        if texte_produit.trim().is_empty() {
            return Err(ClientError::Validation(
                "texte_produit est requis".to_owned(),
            ));
        }
        self.post(
            self.api_url(&["marketing", "generate-seo"])?,
            &SeoBody { texte_produit },
        )
        .await
    }
}
