//! Outgoing integrations.
//!
//! - `backend` - Main backend client (SEO generation)
//! - `images` - Product image downloader

pub mod backend;
pub mod images;

pub use backend::{BackendClient, BackendError};
pub use images::{ImageDownloader, ImageError};
