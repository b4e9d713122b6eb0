//! Typed HTTP client for the marketplace API and the main backend.
//!
//! One [`ApiClient`] serves every page of the storefront, the admin and the
//! sourcing tools. Responses are decoded once here; non-2xx answers become
//! [`ClientError`] carrying the backend's own message.
//!
//! # Services
//!
//! - Marketplace API (`MARKETPLACE_API_URL`): catalog and cart under
//!   `/api/marketplace`, sales journal, boutiques and SEO under `/api`
//! - Main backend (`MAIN_BACKEND_URL`): sourcing, trends, copy generation and
//!   agents, returned as raw JSON
//!
//! Every request carries the configured timeout. Nothing is retried.

mod cart;
mod categories;
mod events;
mod gate;
mod journal;
mod products;
mod seo;
mod sourcing;

pub use gate::RequestGate;
pub use products::{BatchPublishOutcome, PublishOutcome};
pub use sourcing::{Agent, CsvExport};

use std::future::Future;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Marketplace API client.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    api_url: Url,
    backend_url: Url,
    gate: RequestGate,
}

/// Answer of the endpoints that only confirm an action.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct MessageEnvelope {
    #[serde(default)]
    pub message: String,
}

impl ApiClient {
    /// Create a client for the configured services.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                api_url: config.api_url.clone(),
                backend_url: config.backend_url.clone(),
                gate: RequestGate::new(),
            }),
        })
    }

    /// The gate used by [`ApiClient::gated`].
    #[must_use]
    pub fn gate(&self) -> &RequestGate {
        &self.inner.gate
    }

    /// Run `request` as the only in-flight call for `action`.
    ///
    /// # Errors
    ///
    /// Returns the request's error, or [`ClientError::Cancelled`] when a
    /// newer call for the same action superseded it.
    pub async fn gated<T, F>(&self, action: &str, request: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        self.inner.gate.run(action, request).await
    }

    /// URL under `/api/marketplace` on the marketplace API.
    pub(crate) fn marketplace_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        endpoint(&self.inner.api_url, &["api", "marketplace"], segments)
    }

    /// URL under `/api` on the marketplace API.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        endpoint(&self.inner.api_url, &["api"], segments)
    }

    /// URL under `/api` on the main backend.
    pub(crate) fn backend_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        endpoint(&self.inner.backend_url, &["api"], segments)
    }

    /// Execute a GET request.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let response = self.inner.client.get(url).send().await?;
        handle_response(response).await
    }

    /// Execute a GET request with query parameters.
    pub(crate) async fn get_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        url: Url,
        query: &Q,
    ) -> Result<T, ClientError> {
        let response = self.inner.client.get(url).query(query).send().await?;
        handle_response(response).await
    }

    /// Execute a POST request with a JSON body.
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.inner.client.post(url).json(body).send().await?;
        handle_response(response).await
    }

    /// Execute a POST request with query parameters and no body.
    pub(crate) async fn post_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        url: Url,
        query: &Q,
    ) -> Result<T, ClientError> {
        let response = self.inner.client.post(url).query(query).send().await?;
        handle_response(response).await
    }

    /// Execute a POST request and return the raw body (file downloads).
    pub(crate) async fn post_bytes<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<Vec<u8>, ClientError> {
        let response = self.inner.client.post(url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(parse_error(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Execute a PUT request with a JSON body.
    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.inner.client.put(url).json(body).send().await?;
        handle_response(response).await
    }

    /// Execute a PATCH request with a JSON body.
    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.inner.client.patch(url).json(body).send().await?;
        handle_response(response).await
    }

    /// Execute a DELETE request.
    pub(crate) async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let response = self.inner.client.delete(url).send().await?;
        handle_response(response).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.inner.api_url.as_str())
            .field("backend_url", &self.inner.backend_url.as_str())
            .finish_non_exhaustive()
    }
}

/// `base` + `prefix` + `segments`, each segment percent-encoded.
fn endpoint(base: &Url, prefix: &[&str], segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::Parse(format!("Invalid base URL: {base}")))?
        .pop_if_empty()
        .extend(prefix)
        .extend(segments);
    Ok(url)
}

/// Decode a 2xx JSON body, or turn the response into an error.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if response.status().is_success() {
        return response
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("Failed to parse response: {e}")));
    }

    Err(parse_error(response).await)
}

/// Build the error for a non-2xx response.
async fn parse_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_owned()
    });

    tracing::debug!(status = status.as_u16(), %message, "API error response");

    if status == reqwest::StatusCode::NOT_FOUND {
        return ClientError::NotFound(message);
    }

    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

/// The backend's error text: `detail`, then `error`, then `message`, then
/// the raw body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_owned());
    };

    ["detail", "error", "message"]
        .iter()
        .find_map(|key| match value.get(key) {
            Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .or_else(|| Some(trimmed.to_owned()))
}
