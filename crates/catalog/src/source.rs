//! The catalog source abstraction (system of record for products).

use std::sync::Arc;

use async_trait::async_trait;

use storefront_core::{CatalogResult, CatalogSnapshot, Product, ProductId, SourceLink};

/// What a source can do beyond reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceCapabilities {
    /// Whether `add_product` / `delete_product` are offered.
    pub can_write: bool,
}

impl SourceCapabilities {
    pub const READ_ONLY: Self = Self { can_write: false };
    pub const READ_WRITE: Self = Self { can_write: true };
}

/// A catalog source: a live service, a static document, or an in-process store.
///
/// Implementations selected at configuration time sit behind one trait object.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn capabilities(&self) -> SourceCapabilities;

    /// Full catalog at call time.
    async fn list_products(&self) -> CatalogResult<CatalogSnapshot>;

    /// One product; `CatalogError::NotFound` when absent.
    async fn get_product(&self, id: &ProductId) -> CatalogResult<Product>;

    /// Resolve `link` into a product with a newly assigned id and store it.
    async fn add_product(&self, link: &SourceLink) -> CatalogResult<Product>;

    /// Remove a product; `CatalogError::NotFound` when absent (not idempotent).
    async fn delete_product(&self, id: &ProductId) -> CatalogResult<()>;
}

#[async_trait]
impl<S> CatalogSource for Arc<S>
where
    S: CatalogSource + ?Sized,
{
    fn capabilities(&self) -> SourceCapabilities {
        (**self).capabilities()
    }

    async fn list_products(&self) -> CatalogResult<CatalogSnapshot> {
        (**self).list_products().await
    }

    async fn get_product(&self, id: &ProductId) -> CatalogResult<Product> {
        (**self).get_product(id).await
    }

    async fn add_product(&self, link: &SourceLink) -> CatalogResult<Product> {
        (**self).add_product(link).await
    }

    async fn delete_product(&self, id: &ProductId) -> CatalogResult<()> {
        (**self).delete_product(id).await
    }
}
