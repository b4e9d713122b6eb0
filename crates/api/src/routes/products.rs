//! Product catalog route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketplace_core::{
    Product, ProductId, ProductPage, ProductQuery, ProductStatus, PublishRequest, StatusUpdate,
    ValidationAction, WriteMode,
};

use crate::db::{ProductRepository, PublishContext};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

use super::{ApiJson, ApiPath, ApiQuery};

const NOT_FOUND: &str = "Produit non trouvé";

/// Body of `POST /publish-products-batch`: a bare array of products, or
/// the same array under `produits`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchPublishRequest {
    List(Vec<PublishRequest>),
    Wrapped { produits: Vec<PublishRequest> },
}

impl BatchPublishRequest {
    #[must_use]
    pub fn into_products(self) -> Vec<PublishRequest> {
        match self {
            Self::List(produits) | Self::Wrapped { produits } => produits,
        }
    }
}

/// Query of `POST /products/{id}/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub action: String,
}

/// Query of `PATCH /products/{id}`.
#[derive(Debug, Deserialize)]
pub struct PatchQuery {
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub success: bool,
    pub product_id: ProductId,
    pub message: &'static str,
    pub image_downloaded: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchPublishResponse {
    pub success: bool,
    pub product_ids: Vec<ProductId>,
    pub count: usize,
    pub images_downloaded: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub success: bool,
    #[serde(flatten)]
    pub page: ProductPage,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub success: bool,
    pub produit: Product,
}

#[derive(Debug, Serialize)]
pub struct DraftsResponse {
    pub success: bool,
    pub produits: Vec<Product>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub product_id: ProductId,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub product_id: ProductId,
    pub status: ProductStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

/// List products with filters and pagination.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<ProductListResponse>> {
    let (produits, total) = ProductRepository::new(state.pool()).list(&query).await?;

    Ok(Json(ProductListResponse {
        success: true,
        page: ProductPage {
            count: produits.len(),
            produits,
            total,
        },
    }))
}

/// Products waiting for approval.
#[instrument(skip(state))]
pub async fn drafts(State(state): State<AppState>) -> Result<Json<DraftsResponse>> {
    let produits = ProductRepository::new(state.pool()).drafts().await?;

    Ok(Json(DraftsResponse {
        success: true,
        count: produits.len(),
        produits,
    }))
}

/// Product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ProductResponse>> {
    let produit = ProductRepository::new(state.pool())
        .get(&ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))?;

    Ok(Json(ProductResponse {
        success: true,
        produit,
    }))
}

/// Publish (insert or refresh) one product.
#[instrument(skip(state, request), fields(nom = %request.produit.nom))]
pub async fn publish(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PublishRequest>,
) -> Result<Json<PublishResponse>> {
    let (product_id, image_downloaded) = publish_one(&state, &request).await?;
    state.invalidate_featured();

    Ok(Json(PublishResponse {
        success: true,
        product_id,
        message: "Produit publié avec succès",
        image_downloaded,
    }))
}

/// Publish a list of products. Stops at the first invalid one.
#[instrument(skip(state, request), fields(count = tracing::field::Empty))]
pub async fn publish_batch(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BatchPublishRequest>,
) -> Result<Json<BatchPublishResponse>> {
    let produits = request.into_products();
    tracing::Span::current().record("count", produits.len());
    for item in &produits {
        item.validate()?;
    }

    let mut product_ids = Vec::with_capacity(produits.len());
    let mut images_downloaded = 0;
    for item in &produits {
        let (product_id, downloaded) = publish_one(&state, item).await?;
        if downloaded {
            images_downloaded += 1;
        }
        product_ids.push(product_id);
    }
    state.invalidate_featured();

    let count = product_ids.len();
    tracing::info!(count, images_downloaded, "Batch published");

    Ok(Json(BatchPublishResponse {
        success: true,
        product_ids,
        count,
        images_downloaded,
        message: format!("{count} produit(s) publié(s) avec succès"),
    }))
}

/// Update an existing product.
#[instrument(skip(state, request))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<PublishRequest>,
) -> Result<Json<UpdateResponse>> {
    request.validate()?;
    let product_id = ProductId::new(id);

    ProductRepository::new(state.pool())
        .update(&product_id, &request.to_write(WriteMode::Update))
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_FOUND))?;
    state.invalidate_featured();

    Ok(Json(UpdateResponse {
        success: true,
        product_id,
    }))
}

/// Change the status of a product.
///
/// The status is checked before the database is touched.
#[instrument(skip(state))]
pub async fn set_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> Result<Json<StatusResponse>> {
    let status: ProductStatus = body
        .status
        .parse()
        .map_err(|_| AppError::BadRequest("Statut invalide".to_owned()))?;
    let product_id = ProductId::new(id);

    ProductRepository::new(state.pool())
        .set_status(&product_id, status)
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_FOUND))?;
    state.invalidate_featured();

    Ok(Json(StatusResponse {
        success: true,
        product_id,
        status,
        message: format!("Statut modifié avec succès: {status}"),
    }))
}

/// `PATCH /products/{id}?action=status`, the query-string form of
/// [`set_status`]. Any other action is a 400.
#[instrument(skip(state))]
pub async fn patch(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<PatchQuery>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> Result<Json<StatusResponse>> {
    if query.action != "status" {
        return Err(AppError::BadRequest("Action invalide".to_owned()));
    }
    set_status(State(state), ApiPath(id), ApiJson(body)).await
}

/// Approve or reject a draft.
#[instrument(skip(state))]
pub async fn validate(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ValidateQuery>,
) -> Result<Json<StatusResponse>> {
    let action: ValidationAction = query
        .action
        .parse()
        .map_err(|_| AppError::BadRequest("Action invalide. Utilisez 'publish' ou 'reject'".to_owned()))?;
    let product_id = ProductId::new(id);

    let status = ProductRepository::new(state.pool())
        .validate(&product_id, action)
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_FOUND))?;
    state.invalidate_featured();

    let message = match action {
        ValidationAction::Publish => "Produit publié".to_owned(),
        ValidationAction::Reject => "Produit rejeté".to_owned(),
    };

    Ok(Json(StatusResponse {
        success: true,
        product_id,
        status,
        message,
    }))
}

/// Delete a product with its links, events and cart lines.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<MessageResponse>> {
    ProductRepository::new(state.pool())
        .delete(&ProductId::new(id))
        .await
        .map_err(|e| AppError::not_found_as(e, NOT_FOUND))?;
    state.invalidate_featured();

    Ok(Json(MessageResponse {
        success: true,
        message: "Produit supprimé",
    }))
}

/// Validate, upsert and localize the image of one product.
///
/// Returns the product id and whether an image was downloaded. A failed
/// download keeps the original URL.
async fn publish_one(state: &AppState, request: &PublishRequest) -> Result<(ProductId, bool)> {
    request.validate()?;

    let product_id = resolve_id(request);
    let write = request.to_write(WriteMode::Publish);
    let repo = ProductRepository::new(state.pool());
    add_breadcrumb("catalog", "Publishing product", &[("product_id", product_id.as_str())]);

    repo.upsert(
        &product_id,
        &write,
        PublishContext {
            user_id: request.user_id.as_deref(),
            session_id: request.session_id.as_deref(),
        },
    )
    .await?;

    let mut image_downloaded = false;
    if let Some(images) = state.images()
        && !write.image.is_empty()
    {
        match images.download(&product_id, &write.image).await {
            Ok(Some(path)) => {
                repo.set_image(&product_id, &path).await?;
                image_downloaded = true;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(product_id = %product_id, error = %e, "Image download failed, keeping original URL");
            }
        }
    }

    tracing::info!(product_id = %product_id, image_downloaded, "Product published");
    Ok((product_id, image_downloaded))
}

/// Explicit id from the payload, or the content-derived one.
fn resolve_id(request: &PublishRequest) -> ProductId {
    request
        .produit
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(|| request.produit.product_id(), ProductId::new)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(product_id: Option<&str>) -> PublishRequest {
        serde_json::from_value(serde_json::json!({
            "produit": {
                "product_id": product_id,
                "nom": "Montre connectée",
                "prix": 15000,
                "lien": "https://www.jumia.sn/montre",
                "categories": ["Mode", "Électronique"]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_id_prefers_explicit_id() {
        assert_eq!(resolve_id(&request(Some("abc"))), ProductId::new("abc"));
    }

    #[test]
    fn test_resolve_id_derives_when_blank() {
        let derived = request(None).produit.product_id();
        assert_eq!(resolve_id(&request(None)), derived);
        assert_eq!(resolve_id(&request(Some("  "))), derived);
    }
}
