//! Marketplace API library.
//!
//! This crate provides the marketplace backend as a library so the router
//! can be exercised in tests without binding a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{Router, routing::get};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{api_rate_limiter, request_id_middleware};
use crate::services::images::PUBLIC_PREFIX;
use crate::state::AppState;

/// Build the application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    let config = state.config();

    let mut api = routes::routes();
    match api_rate_limiter(config.rate_limit_per_minute) {
        Some(limiter) => api = api.layer(limiter),
        None => tracing::warn!("Rate limiter configuration rejected, running without it"),
    }

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(api);

    if let Some(media_dir) = &config.media_dir {
        router = router.nest_service(PUBLIC_PREFIX, ServeDir::new(media_dir));
    }

    let cors = cors_layer(&config.cors_origins);

    router
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the storefront and admin origins. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use url::Url;

    use crate::config::ApiConfig;

    /// Router over a pool that never connects: requests rejected before any
    /// query never notice.
    fn test_app() -> Router {
        let database_url = "postgres://marketplace@127.0.0.1:1/unreachable";
        let config = ApiConfig::with_defaults(
            database_url,
            Url::parse("http://127.0.0.1:1").unwrap(),
        );
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(database_url)
            .unwrap();
        app(AppState::new(config, pool).unwrap())
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn json(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_readiness_without_database() {
        let response = test_app()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_invalid_status_is_rejected_before_database() {
        for prefix in ["/api/marketplace", "/api"] {
            let (status, body) = send(json(
                Method::PATCH,
                &format!("{prefix}/products/abc/status"),
                r#"{"status": "published"}"#,
            ))
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert_eq!(body["detail"], "Statut invalide");
        }
    }

    #[tokio::test]
    async fn test_patch_action_is_checked_before_database() {
        let (status, body) = send(json(
            Method::PATCH,
            "/api/products/abc?action=rename",
            r#"{"status": "active"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Action invalide");

        let (status, body) = send(json(
            Method::PATCH,
            "/api/products/abc?action=status",
            r#"{"status": "published"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Statut invalide");
    }

    #[tokio::test]
    async fn test_track_event_requires_product_and_type() {
        let (status, body) = send(json(
            Method::POST,
            "/api/marketplace/track-event",
            r#"{"product_id": "abc"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "product_id et event_type sont requis");
    }

    #[tokio::test]
    async fn test_cart_requires_session() {
        let (status, body) = send(
            Request::get("/api/marketplace/cart")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "session_id est requis");
    }

    #[tokio::test]
    async fn test_publish_without_name_is_rejected() {
        let (status, body) = send(json(
            Method::POST,
            "/api/marketplace/publish-product",
            r#"{"produit": {"nom": " ", "prix": 1000}}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Le nom du produit est obligatoire");
    }

    #[tokio::test]
    async fn test_batch_accepts_bare_array_and_wrapped_list() {
        for body in ["[]", r#"{"produits": []}"#] {
            let (status, body) = send(json(
                Method::POST,
                "/api/marketplace/publish-products-batch",
                body,
            ))
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["count"], 0);
        }

        let (status, body) = send(json(
            Method::POST,
            "/api/marketplace/publish-products-batch",
            r#"[{"produit": {"nom": "Lampe", "prix": 3000}}, {"produit": {"nom": "", "prix": 1000}}]"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Le nom du produit est obligatoire");
    }

    #[tokio::test]
    async fn test_bad_sale_date_is_rejected() {
        let (status, body) = send(json(
            Method::POST,
            "/api/journal-vente",
            r#"{"boutique_id": 1, "date_vente": "12/03/2025", "produit_nom": "Sac", "prix": 5000}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn test_bad_period_month_is_rejected() {
        let (status, _) = send(
            Request::get("/api/journal-vente/periode/2025?mois=13")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_json_error() {
        let (status, body) = send(json(Method::POST, "/api/marketplace/cart/add", "{")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_empty_seo_text_is_rejected() {
        let (status, _) = send(json(
            Method::POST,
            "/api/marketing/generate-seo",
            r#"{"texte_produit": ""}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_seo_backend_down_is_unavailable() {
        let (status, body) = send(json(
            Method::POST,
            "/api/products/generate-seo",
            r#"{"texte_produit": "Montre connectée étanche"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body["detail"],
            "Service de génération SEO temporairement indisponible"
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = test_app()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
