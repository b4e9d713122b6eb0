//! Catalog commands against the marketplace API.
//!
//! # Usage
//!
//! ```bash
//! # List drafts matching "montre"
//! mkt products list --status draft --search montre
//!
//! # Flip a product between active and inactive
//! mkt products toggle 3f2a9c1e
//!
//! # Approve or reject a draft
//! mkt products validate 3f2a9c1e publish
//!
//! # Publish a product by hand
//! mkt products publish -n "Lampe" -p 2500 -c Maison
//! ```

use marketplace_client::admin::{ProductFilters, ProductForm, ProductListController};
use marketplace_client::{ApiClient, ClientError};
use marketplace_core::{Product, ProductId, ProductStatus, ValidationAction};

/// List one page of products.
///
/// # Errors
///
/// Returns the API error.
pub async fn list(
    client: ApiClient,
    filters: ProductFilters,
    page: u32,
) -> Result<(), ClientError> {
    let mut controller = ProductListController::new(client);
    controller.set_filters(filters);
    controller.load().await?;
    if page > 1 {
        controller.go_to_page(page);
        controller.load().await?;
    }

    for product in controller.products() {
        print_product(product);
    }

    if let Some(pagination) = controller.pagination() {
        #[allow(clippy::print_stdout)]
        {
            println!(
                "Page {}/{} ({} produits)",
                pagination.current_page,
                pagination.total_pages.max(1),
                controller.total()
            );
        }
    }
    Ok(())
}

/// Switch a product between `active` and `inactive`.
///
/// # Errors
///
/// Returns the API error.
pub async fn toggle(client: ApiClient, id: &str) -> Result<ProductStatus, ClientError> {
    let mut controller = ProductListController::new(client);
    let status = controller.toggle_status(&ProductId::new(id)).await?;
    tracing::info!(product_id = id, %status, "Status updated");
    Ok(status)
}

/// Set a product's status.
///
/// # Errors
///
/// Returns the API error.
pub async fn set_status(
    client: &ApiClient,
    id: &str,
    status: ProductStatus,
) -> Result<(), ClientError> {
    let status = client
        .set_product_status(&ProductId::new(id), status)
        .await?;
    tracing::info!(product_id = id, %status, "Status updated");
    Ok(())
}

/// Approve (`publish`) or `reject` a product.
///
/// # Errors
///
/// Returns the API error.
pub async fn validate(
    client: &ApiClient,
    id: &str,
    action: ValidationAction,
) -> Result<(), ClientError> {
    let message = client
        .validate_product(&ProductId::new(id), action)
        .await?;
    tracing::info!(product_id = id, action = action.as_str(), "{message}");
    Ok(())
}

/// Publish the product described by `form`.
///
/// # Errors
///
/// Returns [`ClientError::Validation`] for an incomplete form, otherwise the
/// API error.
pub async fn publish(client: &ApiClient, form: &ProductForm) -> Result<(), ClientError> {
    let outcome = form.submit(client).await?;
    #[allow(clippy::print_stdout)]
    {
        println!("{}", outcome.product_id);
    }
    tracing::info!(image_downloaded = outcome.image_downloaded, "{}", outcome.message);
    Ok(())
}

/// Delete a product.
///
/// # Errors
///
/// Returns the API error.
pub async fn delete(client: &ApiClient, id: &str) -> Result<(), ClientError> {
    client.delete_product(&ProductId::new(id)).await?;
    tracing::info!(product_id = id, "Product deleted");
    Ok(())
}

fn print_product(product: &Product) {
    let price = product
        .prix_texte
        .clone()
        .unwrap_or_else(|| product.prix.normalize().to_string());
    #[allow(clippy::print_stdout)]
    {
        println!(
            "{}\t{}\t{}\t{}",
            product.product_id, product.status, price, product.nom
        );
    }
}
