//! Product image downloader.
//!
//! External product images are copied into the media directory so the
//! storefront does not hotlink competitor CDNs. Files are served back under
//! [`PUBLIC_PREFIX`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

use marketplace_core::ProductId;

/// URL prefix the media directory is served under.
pub const PUBLIC_PREFIX: &str = "/images/products";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_EXTENSION: &str = ".jpg";

/// Errors that can occur while downloading an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloads product images into a local directory.
#[derive(Clone)]
pub struct ImageDownloader {
    client: reqwest::Client,
    media_dir: PathBuf,
}

impl ImageDownloader {
    /// Create a downloader writing into `media_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(media_dir: impl Into<PathBuf>) -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            media_dir: media_dir.into(),
        })
    }

    /// Directory the images are written to.
    #[must_use]
    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Download `image_url` for a product.
    ///
    /// Returns the public path of the stored file, or `None` when the URL is
    /// not a remote `http(s)` URL.
    ///
    /// # Errors
    ///
    /// Returns error if the download or the write fails.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn download(
        &self,
        product_id: &ProductId,
        image_url: &str,
    ) -> Result<Option<String>, ImageError> {
        let Some(url) = remote_url(image_url) else {
            return Ok(None);
        };

        let filename = file_name(product_id, &url);
        let target = self.media_dir.join(&filename);

        if tokio::fs::try_exists(&target).await? {
            tracing::debug!(file = %filename, "Image already downloaded");
            return Ok(Some(public_path(&filename)));
        }

        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        tokio::fs::create_dir_all(&self.media_dir).await?;
        tokio::fs::write(&target, &bytes).await?;

        tracing::info!(file = %filename, size = bytes.len(), "Image downloaded");
        Ok(Some(public_path(&filename)))
    }
}

/// Parse `value` if it is an absolute `http(s)` URL.
fn remote_url(value: &str) -> Option<Url> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return None;
    }
    Url::parse(value).ok()
}

/// `{product_id}_{8 hex chars of the URL digest}{extension}`.
fn file_name(product_id: &ProductId, url: &Url) -> String {
    let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));
    let short = digest.get(..8).unwrap_or(&digest);
    format!("{product_id}_{short}{}", extension(url))
}

/// Extension of the last path segment, `.jpg` when there is none.
fn extension(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(char::is_alphanumeric))
        .map_or_else(
            || DEFAULT_EXTENSION.to_string(),
            |ext| format!(".{}", ext.to_lowercase()),
        )
}

fn public_path(filename: &str) -> String {
    format!("{PUBLIC_PREFIX}/{filename}")
}
