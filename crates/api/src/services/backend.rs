//! Client for the main backend (SEO generation, sourcing agents).
//!
//! The marketplace API only forwards to it; the generation logic lives there.

use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

/// Timeout applied to every call to the main backend.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when calling the main backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection refused, timeout...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configured base URL cannot be joined with a path.
    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Main backend API client.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Generate SEO copy for a product description.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or answers with an error.
    #[tracing::instrument(skip(self, texte_produit), fields(len = texte_produit.len()))]
    pub async fn generate_seo(&self, texte_produit: &str) -> Result<Value, BackendError> {
        self.post_json(
            "/api/marketing/generate-seo",
            &json!({ "texte_produit": texte_produit }),
        )
        .await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, BackendError> {
        let url = self.base_url.join(path)?;

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }
}
