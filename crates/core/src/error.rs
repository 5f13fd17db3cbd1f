//! Catalog error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the catalog layers.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog-level error.
///
/// Every failure a catalog source or client can surface maps onto one of these
/// variants. Transport details are flattened into strings so the error stays
/// `Clone` and comparable in tests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Network, transport, timeout or decode failure.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// No product with the given id exists.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// A submitted link could not be resolved into a product.
    #[error("ingest failed: {0}")]
    Ingest(String),

    /// The source does not offer this operation (e.g. writes on a static file).
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The source rejected the caller's credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Persisting catalog state failed on the source side.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl CatalogError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::Ingest(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found(id: ProductId) -> Self {
        Self::NotFound(id)
    }

    /// Whether retrying the same read could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Fetch(_))
    }
}
