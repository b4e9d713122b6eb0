//! Integration tests for the marketplace.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```
//!
//! Most tests need no database: the API runs over a pool that never connects,
//! and client behavior is checked against small axum stubs. The repository
//! tests need `PostgreSQL` and are ignored unless asked for:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/marketplace cargo test -p marketplace-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `api_server` - The real router served over TCP, driven by `ApiClient`
//! - `client_stub` - Client error mapping, list reloads and request cancellation
//! - `repositories` - Cart, catalog and sales journal SQL against `PostgreSQL`
//! - `selection_sync` - Two selection stores sharing one storage directory

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use marketplace_api::config::ApiConfig;
use marketplace_api::state::AppState;
use marketplace_client::{ApiClient, ClientConfig, ClientError};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use url::Url;

/// Address nothing listens on.
pub const UNREACHABLE: &str = "http://127.0.0.1:1";

/// Serve `router` on an ephemeral local port until the test ends.
///
/// # Errors
///
/// Returns error if no local port can be bound.
pub async fn serve(router: Router) -> std::io::Result<Url> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let service = router.into_make_service_with_connect_info::<SocketAddr>();
        // The server lives as long as the test runtime.
        let _ = axum::serve(listener, service).await;
    });
    Url::parse(&format!("http://{addr}"))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
}

/// The marketplace router over a database pool that never connects and a
/// main backend that is down.
///
/// # Errors
///
/// Returns error if the pool or the state cannot be built.
pub fn offline_api() -> Result<Router, Box<dyn std::error::Error>> {
    let database_url = "postgres://marketplace@127.0.0.1:1/unreachable";
    let backend = Url::parse(UNREACHABLE)?;
    let config = ApiConfig::with_defaults(database_url, backend);
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy(database_url)?;
    Ok(marketplace_api::app(AppState::new(config, pool)?))
}

/// Client pointed at `api` for the marketplace API, with the main backend
/// down.
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built.
pub fn client_for(api: Url) -> Result<ApiClient, ClientError> {
    let backend = Url::parse(UNREACHABLE).map_err(|e| ClientError::Parse(e.to_string()))?;
    let mut config = ClientConfig::new(api, backend);
    config.http_timeout = Duration::from_secs(5);
    ApiClient::new(&config)
}

/// A product as the API serves it.
#[must_use]
pub fn product_json(product_id: &str, nom: &str, status: &str) -> Value {
    json!({
        "product_id": product_id,
        "nom": nom,
        "prix": 15000,
        "prix_texte": "15000 FCFA",
        "categorie": "Mode",
        "source": "Jumia",
        "status": status,
        "validated": false,
        "created_at": "2025-06-01T10:00:00Z",
        "updated_at": "2025-06-01T10:00:00Z",
    })
}
