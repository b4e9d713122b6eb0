//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! # Backend (/api/marketplace)
//! GET    /categories                      - All categories
//! GET    /categories/{categorie}/produits - Active products of a category
//! GET    /categories-phares               - Featured categories
//! GET    /products                        - Filtered, paginated listing
//! GET    /products/drafts                 - Products awaiting approval
//! GET    /products/{id}                   - Product detail
//! PUT    /products/{id}                   - Update a product
//! DELETE /products/{id}                   - Delete a product
//! PATCH  /products/{id}/status            - Change status
//! PATCH  /products/{id}?action=status     - Same, query-string form
//! POST   /products/{id}/validate          - Approve (?action=publish) or reject a draft
//! POST   /publish-product                 - Publish (upsert) one product
//! POST   /publish-products-batch          - Publish a list of products
//! POST   /track-event                     - Record a product event
//! GET    /cart?session_id=                - Cart of a session
//! DELETE /cart?session_id=                - Empty a cart
//! POST   /cart/add                        - Add a product
//! PUT    /cart/update                     - Set a quantity
//! DELETE /cart/{product_id}?session_id=   - Remove a line
//!
//! # Storefront and admin (/api)
//! Same catalog and cart routes, with POST /products (publish),
//! POST /products/track and POST /products/generate-seo, plus:
//! POST   /marketing/generate-seo          - SEO copy from the main backend
//! GET    /boutiques, POST /boutiques      - Boutiques
//! GET|PUT|DELETE /boutiques/{id}
//! GET    /journal-vente, POST /journal-vente
//! GET    /journal-vente/statistiques
//! GET    /journal-vente/periode/{annee}
//! GET|PUT|DELETE /journal-vente/{id}
//! ```

pub mod boutiques;
pub mod cart;
pub mod categories;
pub mod events;
pub mod journal;
pub mod marketing;
pub mod products;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    routing::{get, patch, post, put},
};

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejections render as [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections render as [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor whose rejections render as [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Catalog routes shared by both trees.
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories::index))
        .route("/categories/{categorie}/produits", get(categories::products))
        .route("/categories-phares", get(categories::featured))
        .route("/products/drafts", get(products::drafts))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .patch(products::patch)
                .delete(products::delete),
        )
        .route("/products/{id}/status", patch(products::set_status))
        .route("/products/{id}/validate", post(products::validate))
}

/// Server cart routes shared by both trees.
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/add", post(cart::add))
        .route("/update", put(cart::update))
        .route("/{product_id}", axum::routing::delete(cart::remove))
}

/// Routes of the marketplace backend, nested under `/api/marketplace`.
pub fn marketplace_routes() -> Router<AppState> {
    catalog_routes()
        .route("/products", get(products::index))
        .route("/publish-product", post(products::publish))
        .route("/publish-products-batch", post(products::publish_batch))
        .route("/track-event", post(events::track))
        .nest("/cart", cart_routes())
}

/// Routes used by the storefront and the admin, nested under `/api`.
pub fn public_routes() -> Router<AppState> {
    catalog_routes()
        .route("/products", get(products::index).post(products::publish))
        .route("/products/track", post(events::track))
        .route("/products/generate-seo", post(marketing::generate_seo))
        .route("/marketing/generate-seo", post(marketing::generate_seo))
        .nest("/cart", cart_routes())
        .route("/boutiques", get(boutiques::index).post(boutiques::create))
        .route(
            "/boutiques/{id}",
            get(boutiques::show)
                .put(boutiques::update)
                .delete(boutiques::delete),
        )
        .route("/journal-vente", get(journal::index).post(journal::create))
        .route("/journal-vente/statistiques", get(journal::statistics))
        .route("/journal-vente/periode/{annee}", get(journal::period))
        .route(
            "/journal-vente/{id}",
            get(journal::show).put(journal::update).delete(journal::delete),
        )
}

/// All API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/marketplace", marketplace_routes())
        .nest("/api", public_routes())
}
