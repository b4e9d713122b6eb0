//! Admin screens: the product list and the product form.

pub mod form;
pub mod products;

pub use form::ProductForm;
pub use products::{ProductFilters, ProductListController};
