//! Marketplace Core - Shared types library.
//!
//! This crate provides common types used across all marketplace components:
//! - `api` - Marketplace REST backend (products, categories, cart, sales journal)
//! - `client` - Typed API client and local selection storage
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, statuses, products, selections and sales
//! - [`pagination`] - Page window calculation for paginated listings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pagination;
pub mod types;

pub use pagination::{PageItem, Pagination, visible_pages};
pub use types::*;
