//! CLI command implementations.

pub mod migrate;
pub mod products;
pub mod sales;
pub mod selection;
