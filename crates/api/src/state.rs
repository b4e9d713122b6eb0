//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use marketplace_core::FeaturedCategory;

use crate::config::ApiConfig;
use crate::services::{BackendClient, BackendError, ImageDownloader, ImageError};

/// Featured categories are recomputed at most once per minute.
const FEATURED_TTL: Duration = Duration::from_secs(60);

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Backend(#[from] BackendError),
    #[error("image downloader: {0}")]
    Images(#[from] ImageError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    backend: BackendClient,
    images: Option<ImageDownloader>,
    featured: Cache<i64, Arc<Vec<FeaturedCategory>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Image downloads are enabled when `config.media_dir` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let backend = BackendClient::new(config.main_backend_url.clone())?;
        let images = config
            .media_dir
            .as_ref()
            .map(ImageDownloader::new)
            .transpose()?;
        let featured = Cache::builder()
            .max_capacity(64)
            .time_to_live(FEATURED_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                backend,
                images,
                featured,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the main backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Image downloader, when downloads are enabled.
    #[must_use]
    pub fn images(&self) -> Option<&ImageDownloader> {
        self.inner.images.as_ref()
    }

    /// Cache of featured categories keyed by limit.
    #[must_use]
    pub fn featured_cache(&self) -> &Cache<i64, Arc<Vec<FeaturedCategory>>> {
        &self.inner.featured
    }

    /// Drop cached featured categories after a catalog change.
    pub fn invalidate_featured(&self) {
        self.inner.featured.invalidate_all();
    }
}
