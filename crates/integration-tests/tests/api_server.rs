//! The marketplace router served over TCP and driven by `ApiClient`.
//!
//! The database and the main backend are both unreachable, so these tests
//! cover what the API answers without them and how the client surfaces it.

#![allow(clippy::unwrap_used)]

use marketplace_client::ClientError;
use marketplace_client::admin::ProductForm;
use marketplace_core::{AddToCart, ProductId, TrackEvent};
use marketplace_integration_tests::{UNREACHABLE, client_for, offline_api, serve};
use url::Url;

#[tokio::test]
async fn test_health_over_tcp() {
    let url = serve(offline_api().unwrap()).await.unwrap();

    let response = reqwest::get(url.join("health").unwrap()).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");

    let ready = reqwest::get(url.join("health/ready").unwrap()).await.unwrap();
    assert_eq!(ready.status(), 503);
}

#[tokio::test]
async fn test_seo_backend_down_reaches_the_client() {
    let url = serve(offline_api().unwrap()).await.unwrap();
    let client = client_for(url).unwrap();

    let err = client.generate_seo("Montre connectée").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 503, .. }));
    assert_eq!(
        err.user_message(),
        "Service de génération SEO temporairement indisponible"
    );
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let url = serve(offline_api().unwrap()).await.unwrap();

    let response = reqwest::Client::new()
        .get(url.join("health").unwrap())
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-42"
    );
}

#[tokio::test]
async fn test_client_validation_sends_nothing() {
    // Nothing listens here: any request would fail with a transport error.
    let client = client_for(Url::parse(UNREACHABLE).unwrap()).unwrap();

    let err = ProductForm::default().submit(&client).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = client
        .add_to_cart(&AddToCart {
            session_id: "session_1".to_owned(),
            product_id: ProductId::new("a1b2c3d4"),
            quantite: 0,
        })
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "La quantité doit être positive");

    let err = client.track_event(&TrackEvent::default()).await.unwrap_err();
    assert_eq!(err.user_message(), "product_id et event_type sont requis");
}

#[tokio::test]
async fn test_unreachable_api_is_a_transport_error() {
    let client = client_for(Url::parse(UNREACHABLE).unwrap()).unwrap();
    let err = client.categories().await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
}
