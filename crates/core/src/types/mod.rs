//! Core types for the marketplace.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod category;
pub mod event;
pub mod id;
pub mod price;
pub mod product;
pub mod sale;
pub mod selection;
pub mod status;

pub use cart::{AddToCart, Cart, CartItem, UpdateCart};
pub use category::{Category, FeaturedCategory, round_score, slugify};
pub use event::{ProductEvent, TrackEvent};
pub use id::*;
pub use price::{CurrencyCode, Price, decimal_number, opt_decimal_number, price_label};
pub use product::*;
pub use sale::*;
pub use selection::*;
pub use status::*;
