//! Admin product list: filters, paging and the status toggle.

use marketplace_core::{
    PageItem, Pagination, Product, ProductId, ProductPage, ProductQuery, ProductStatus,
};

use crate::api::ApiClient;
use crate::error::ClientError;

/// Gate action of list loads; a new load aborts the one in flight.
pub const LOAD_ACTION: &str = "admin.products.load";
/// Products per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Filters of the admin product list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
    /// `None` lists every status.
    pub status: Option<ProductStatus>,
    pub search: Option<String>,
    pub categorie: Option<String>,
}

/// State behind the admin product list.
#[derive(Debug)]
pub struct ProductListController {
    client: ApiClient,
    filters: ProductFilters,
    limit: u32,
    offset: u64,
    page: Option<ProductPage>,
    error: Option<String>,
}

impl ProductListController {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self::with_page_size(client, DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub fn with_page_size(client: ApiClient, limit: u32) -> Self {
        Self {
            client,
            filters: ProductFilters::default(),
            limit: limit.max(1),
            offset: 0,
            page: None,
            error: None,
        }
    }

    /// Query sent on the next load.
    #[must_use]
    pub fn query(&self) -> ProductQuery {
        ProductQuery {
            status: self.filters.status,
            limit: Some(self.limit),
            offset: Some(self.offset),
            categorie: self.filters.categorie.clone(),
            search: self.filters.search.clone(),
        }
    }

    /// Fetch the current page.
    ///
    /// On failure the error message is kept and the previous page stays.
    ///
    /// # Errors
    ///
    /// Returns the API error, or [`ClientError::Cancelled`] when a newer load
    /// superseded this one.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        let query = self.query();
        let client = self.client.clone();
        let result = self
            .client
            .gated(LOAD_ACTION, async move { client.list_products(&query).await })
            .await;

        match result {
            Ok(page) => {
                tracing::debug!(count = page.count, total = page.total, "Product list loaded");
                self.page = Some(page);
                self.error = None;
                Ok(())
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => {
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Switch a product between `active` and `inactive`, then reload the list.
    ///
    /// Nothing is reloaded when the change fails; the error message is kept.
    ///
    /// # Errors
    ///
    /// Returns the API error of the status change or of the reload.
    pub async fn toggle_status(&mut self, id: &ProductId) -> Result<ProductStatus, ClientError> {
        let current = match self.products().iter().find(|p| &p.product_id == id) {
            Some(product) => product.status,
            None => self.client.product(id).await?.status,
        };
        let target = current.toggled();

        match self.client.set_product_status(id, target).await {
            Ok(status) => {
                tracing::info!(product_id = %id, %status, "Product status changed");
                self.load().await?;
                Ok(status)
            }
            Err(e) => {
                tracing::warn!(product_id = %id, error = %e, "Product status change failed");
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Replace the filters and go back to the first page.
    pub fn set_filters(&mut self, filters: ProductFilters) {
        self.filters = filters;
        self.offset = 0;
    }

    pub fn set_status_filter(&mut self, status: Option<ProductStatus>) {
        self.filters.status = status;
        self.offset = 0;
    }

    pub fn set_search(&mut self, search: &str) {
        let search = search.trim();
        self.filters.search = (!search.is_empty()).then(|| search.to_owned());
        self.offset = 0;
    }

    /// Move to `page` (1-based) of the last loaded listing.
    pub fn go_to_page(&mut self, page: u32) {
        self.offset = self
            .pagination()
            .map_or(0, |pagination| pagination.offset_for(page));
    }

    #[must_use]
    pub fn filters(&self) -> &ProductFilters {
        &self.filters
    }

    /// Products of the last loaded page.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        self.page.as_ref().map_or(&[], |page| page.produits.as_slice())
    }

    /// Total matching products, across pages.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.page.as_ref().map_or(0, |page| page.total)
    }

    /// Message of the last failure, cleared by a successful load.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn pagination(&self) -> Option<Pagination> {
        self.page
            .as_ref()
            .map(|page| Pagination::from_offset(page.total, self.limit, self.offset))
    }

    /// Page links to show, empty when everything fits on one page.
    #[must_use]
    pub fn page_window(&self) -> Vec<PageItem> {
        self.pagination()
            .and_then(|pagination| pagination.window())
            .unwrap_or_default()
    }
}
