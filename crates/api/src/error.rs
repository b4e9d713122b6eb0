//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Every error is rendered as
//! `{"success": false, "detail": "<message>"}`; server errors are captured to
//! Sentry first and their details are never sent to the client.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use marketplace_core::{DateError, ProductValidationError};

use crate::db::RepositoryError;
use crate::services::backend::BackendError;

/// Application-level error type for the marketplace API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unique constraint hit.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The main backend answered with an error.
    #[error("Upstream error: {0}")]
    Upstream(#[from] BackendError),

    /// A dependency could not be reached.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Turn a repository `NotFound` into [`AppError::NotFound`] with `message`.
    #[must_use]
    pub fn not_found_as(err: RepositoryError, message: &str) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound(message.to_owned()),
            other => Self::Database(other),
        }
    }

    /// Message sent to the client.
    fn detail(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Ressource non trouvée".to_string(),
            Self::Database(RepositoryError::Conflict(msg))
            | Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => "Erreur interne du serveur".to_string(),
            Self::Upstream(_) => "Erreur du service externe".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "success": false,
            "detail": self.detail(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<ProductValidationError> for AppError {
    fn from(err: ProductValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<DateError> for AppError {
    fn from(err: DateError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for a catalog action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_not_found_as_keeps_other_errors() {
        let err = AppError::not_found_as(RepositoryError::NotFound, "Produit non trouvé");
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Produit non trouvé"));

        let err = AppError::not_found_as(RepositoryError::Conflict("dup".to_owned()), "x");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Produit non trouvé".to_string());
        assert_eq!(err.to_string(), "Not found: Produit non trouvé");

        let err = AppError::BadRequest("Statut invalide".to_string());
        assert_eq!(err.to_string(), "Bad request: Statut invalide");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("x".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database(RepositoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database(RepositoryError::Conflict("dup".to_string())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ServiceUnavailable("x".to_string()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Internal("x".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_body_carries_detail() {
        let (status, body) = body_json(AppError::BadRequest("Statut invalide".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["detail"], "Statut invalide");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) =
            body_json(AppError::Internal("connection refused at 10.0.0.3".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Erreur interne du serveur");
    }

    #[test]
    fn test_validation_errors_are_bad_requests() {
        let err = AppError::from(ProductValidationError::MissingName);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "Le nom du produit est obligatoire");
    }
}
