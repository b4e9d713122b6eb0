//! Client behavior against a stub marketplace API.
//!
//! The stub keeps one product in memory and counts list requests, so the
//! tests can see which calls the admin controller actually makes.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use marketplace_client::admin::ProductListController;
use marketplace_client::{ApiClient, ClientError};
use marketplace_core::{
    ProductId, ProductInput, ProductQuery, ProductStatus, PublishRequest, ValidationAction,
};
use marketplace_integration_tests::{client_for, product_json, serve};
use serde_json::{Value, json};

const PRODUCT: &str = "a1b2c3d4";
const BROKEN: &str = "broken00";

#[derive(Clone)]
struct Stub {
    status: Arc<Mutex<String>>,
    list_calls: Arc<AtomicUsize>,
}

impl Stub {
    fn new() -> Self {
        Self {
            status: Arc::new(Mutex::new("active".to_owned())),
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

async fn list(State(stub): State<Stub>, Query(query): Query<Value>) -> Json<Value> {
    stub.list_calls.fetch_add(1, Ordering::SeqCst);
    if query["search"] == "lent" {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    let status = stub.status.lock().unwrap().clone();
    Json(json!({
        "produits": [product_json(PRODUCT, "Montre", &status)],
        "count": 1,
        "total": 1,
    }))
}

async fn show(Path(id): Path<String>, State(stub): State<Stub>) -> (StatusCode, Json<Value>) {
    if id != PRODUCT {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Produit non trouvé"})),
        );
    }
    let status = stub.status.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(json!({"success": true, "produit": product_json(PRODUCT, "Montre", &status)})),
    )
}

async fn set_status(
    Path(id): Path<String>,
    State(stub): State<Stub>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if id == BROKEN {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "detail": "Base de données indisponible"})),
        );
    }
    let status = body["status"].as_str().unwrap_or_default().to_owned();
    *stub.status.lock().unwrap() = status.clone();
    (
        StatusCode::OK,
        Json(json!({"success": true, "product_id": id, "status": status})),
    )
}

async fn validate(Query(query): Query<Value>) -> (StatusCode, Json<Value>) {
    if query["action"] == "reject" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"success": false, "error": "Produit déjà publié"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"success": true, "message": "Produit publié"})),
    )
}

/// Accepts only the bare-array body.
async fn publish_batch(Json(produits): Json<Vec<Value>>) -> Json<Value> {
    let product_ids: Vec<String> = produits
        .iter()
        .map(|item| format!("id-{}", item["produit"]["nom"].as_str().unwrap_or_default()))
        .collect();
    Json(json!({
        "success": true,
        "count": product_ids.len(),
        "product_ids": product_ids,
    }))
}

async fn teapot() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream exploded")
}

async fn start() -> (Stub, ApiClient) {
    let stub = Stub::new();
    let router = Router::new()
        .route("/api/marketplace/products", get(list))
        .route("/api/marketplace/products/drafts", get(teapot))
        .route("/api/marketplace/products/{id}", get(show))
        .route("/api/marketplace/products/{id}/status", patch(set_status))
        .route("/api/marketplace/products/{id}/validate", post(validate))
        .route("/api/marketplace/publish-products-batch", post(publish_batch))
        .with_state(stub.clone());
    let url = serve(router).await.unwrap();
    (stub, client_for(url).unwrap())
}

#[tokio::test]
async fn test_toggle_refetches_the_list() {
    let (stub, client) = start().await;
    let mut controller = ProductListController::new(client);

    controller.load().await.unwrap();
    assert_eq!(controller.products()[0].status, ProductStatus::Active);
    assert_eq!(stub.list_calls(), 1);

    let id = ProductId::new(PRODUCT);
    let status = controller.toggle_status(&id).await.unwrap();
    assert_eq!(status, ProductStatus::Inactive);
    assert_eq!(stub.list_calls(), 2);
    assert_eq!(controller.products()[0].status, ProductStatus::Inactive);
    assert!(controller.error().is_none());

    controller.toggle_status(&id).await.unwrap();
    assert_eq!(controller.products()[0].status, ProductStatus::Active);
}

#[tokio::test]
async fn test_failed_toggle_keeps_list_and_message() {
    let (stub, client) = start().await;
    let mut controller = ProductListController::new(client.clone());
    controller.load().await.unwrap();

    // Not in the loaded page and unknown to the API.
    let err = controller
        .toggle_status(&ProductId::new(BROKEN))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(ref m) if m == "Produit non trouvé"));

    let err = client
        .set_product_status(&ProductId::new(BROKEN), ProductStatus::Inactive)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api { status: 500, ref message } if message == "Base de données indisponible"
    ));
    assert_eq!(stub.list_calls(), 1);
    assert_eq!(controller.products().len(), 1);
}

#[tokio::test]
async fn test_error_message_sources() {
    let (_, client) = start().await;
    let id = ProductId::new(PRODUCT);

    let message = client
        .validate_product(&id, ValidationAction::Publish)
        .await
        .unwrap();
    assert_eq!(message, "Produit publié");

    let err = client
        .validate_product(&id, ValidationAction::Reject)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 409, .. }));
    assert_eq!(err.user_message(), "Produit déjà publié");

    // A plain-text body is the message as is.
    let err = client.draft_products().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api { status: 502, ref message } if message == "upstream exploded"
    ));
}

#[tokio::test]
async fn test_batch_is_sent_as_bare_array() {
    let (_, client) = start().await;
    let request = |nom: &str| PublishRequest {
        produit: ProductInput {
            nom: nom.to_owned(),
            prix: Some(15_000.into()),
            ..ProductInput::default()
        },
        ..PublishRequest::default()
    };

    let outcome = client
        .publish_products(&[request("Montre"), request("Sac")])
        .await
        .unwrap();
    assert_eq!(outcome.count, 2);
    assert_eq!(
        outcome.product_ids,
        vec![ProductId::new("id-Montre"), ProductId::new("id-Sac")]
    );
}

#[tokio::test]
async fn test_newer_load_cancels_older_one() {
    let (stub, client) = start().await;
    let slow = ProductQuery {
        search: Some("lent".to_owned()),
        ..ProductQuery::default()
    };
    let fast = ProductQuery::default();

    let first = client.gated("search", client.list_products(&slow));
    let second = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.gated("search", client.list_products(&fast)).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, Err(ClientError::Cancelled)));
    assert_eq!(second.unwrap().count, 1);
    assert_eq!(stub.list_calls(), 2);
    assert_eq!(client.gate().in_flight(), 0);
}
