//! Category route handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketplace_core::{Category, FeaturedCategory, Product};

use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::{ApiPath, ApiQuery};

const DEFAULT_CATEGORY_PRODUCTS: i64 = 4;
const DEFAULT_FEATURED: i64 = 6;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    fn resolve(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub success: bool,
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct CategoryProductsResponse {
    pub success: bool,
    pub produits: Vec<Product>,
    pub categorie: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct FeaturedResponse {
    pub success: bool,
    pub categories: Arc<Vec<FeaturedCategory>>,
}

/// All categories ordered by name.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<CategoriesResponse>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;

    Ok(Json(CategoriesResponse {
        success: true,
        categories,
    }))
}

/// Active products of a category.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    ApiPath(categorie): ApiPath<String>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Json<CategoryProductsResponse>> {
    let produits = ProductRepository::new(state.pool())
        .by_category(&categorie, query.resolve(DEFAULT_CATEGORY_PRODUCTS))
        .await?;

    Ok(Json(CategoryProductsResponse {
        success: true,
        count: produits.len(),
        produits,
        categorie,
    }))
}

/// Featured categories, cached for a minute per limit.
#[instrument(skip(state))]
pub async fn featured(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Json<FeaturedResponse>> {
    let limit = query.resolve(DEFAULT_FEATURED);
    let pool = state.pool().clone();

    let categories = state
        .featured_cache()
        .try_get_with(limit, async move {
            let rows = CategoryRepository::new(&pool).featured(limit).await?;
            Ok::<_, RepositoryError>(Arc::new(rows))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(FeaturedResponse {
        success: true,
        categories,
    }))
}
