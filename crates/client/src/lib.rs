//! Marketplace client library.
//!
//! Everything the storefront, the admin and the sourcing tools need on the
//! client side, written once:
//!
//! - [`api`] - Typed `ApiClient` over the marketplace API and the main backend
//! - [`store`] - Storage backends, the observable selection store (boutique
//!   and campaign lists), page caches and the session id
//! - [`admin`] - Product list controller and product form
//!
//! # Configuration
//!
//! See [`config::ClientConfig`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod api;
pub mod config;
pub mod error;
pub mod store;

pub use api::{ApiClient, RequestGate};
pub use config::ClientConfig;
pub use error::{ClientError, SelectionError, StorageError};
