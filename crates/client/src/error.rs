//! Client-side error types.
//!
//! Three layers, each with its own enum:
//!
//! - [`ClientError`] - anything that goes wrong talking to the API or the main backend
//! - [`StorageError`] - the local key/value storage
//! - [`SelectionError`] - the selection store, with the messages shown to the user

use marketplace_core::ProductValidationError;
use thiserror::Error;

/// Errors returned by [`ApiClient`](crate::ApiClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connection refused, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Non-2xx response, with the message from `detail`, `error` or `message`.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// 404 from the API.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Refused locally, before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// Superseded by a newer request for the same action.
    #[error("Request cancelled")]
    Cancelled,

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,
}

impl ClientError {
    /// Message to show the user: the backend's own message when there is one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::NotFound(message) | Self::Validation(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

impl From<ProductValidationError> for ClientError {
    fn from(err: ProductValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Errors from a [`StorageBackend`](crate::store::StorageBackend).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would exceed the storage quota.
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the [`SelectionStore`](crate::store::SelectionStore).
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Ce produit est déjà dans votre boutique")]
    AlreadyPresent,

    /// Even without inline images the list does not fit.
    #[error("Espace de stockage plein. Veuillez supprimer des produits ou vider le cache.")]
    StorageFull,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_messages() {
        assert_eq!(
            SelectionError::AlreadyPresent.to_string(),
            "Ce produit est déjà dans votre boutique"
        );
        assert!(SelectionError::StorageFull.to_string().starts_with("Espace de stockage plein"));
    }

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = ClientError::Api {
            status: 400,
            message: "Statut invalide".to_owned(),
        };
        assert_eq!(err.user_message(), "Statut invalide");
        assert_eq!(ClientError::Cancelled.user_message(), "Request cancelled");
    }

    #[test]
    fn test_validation_from_product_error() {
        let err = ClientError::from(ProductValidationError::MissingName);
        assert!(matches!(err, ClientError::Validation(ref m) if m == "Le nom du produit est obligatoire"));
    }
}
