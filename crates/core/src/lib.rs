//! `storefront-core` — catalog building blocks.
//!
//! This crate contains the **pure** product/catalog model shared by the client and
//! the catalog service (no IO, no HTTP, no storage).

pub mod catalog;
pub mod error;
pub mod id;
pub mod product;

pub use catalog::{CatalogDocument, CatalogSnapshot, DuplicateProductId};
pub use error::{CatalogError, CatalogResult};
pub use id::{InvalidProductId, ProductId};
pub use product::{InvalidProduct, Product, ProductDetails, SourceLink};
