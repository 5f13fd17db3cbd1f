//! In-process catalog store.
//!
//! Used by the catalog service as its system of record and by tests as a
//! deterministic source.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use storefront_core::{CatalogError, CatalogResult, CatalogSnapshot, Product, ProductId, SourceLink};

use crate::ingest::Ingestor;
use crate::source::{CatalogSource, SourceCapabilities};

/// Catalog held in memory. New products go to the front.
#[derive(Clone, Default)]
pub struct InMemoryCatalogSource {
    snapshot: Arc<RwLock<CatalogSnapshot>>,
    ingestor: Option<Arc<dyn Ingestor>>,
}

impl InMemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
            ingestor: None,
        }
    }

    /// Enable `add_product` by resolving links through `ingestor`.
    pub fn with_ingestor(mut self, ingestor: Arc<dyn Ingestor>) -> Self {
        self.ingestor = Some(ingestor);
        self
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Replace the whole catalog.
    pub async fn replace(&self, snapshot: CatalogSnapshot) {
        *self.snapshot.write().await = snapshot;
    }
}

impl std::fmt::Debug for InMemoryCatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCatalogSource")
            .field("has_ingestor", &self.ingestor.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalogSource {
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::READ_WRITE
    }

    async fn list_products(&self) -> CatalogResult<CatalogSnapshot> {
        Ok(self.snapshot().await)
    }

    async fn get_product(&self, id: &ProductId) -> CatalogResult<Product> {
        self.snapshot
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(id.clone()))
    }

    async fn add_product(&self, link: &SourceLink) -> CatalogResult<Product> {
        let ingestor = self
            .ingestor
            .as_ref()
            .ok_or_else(|| CatalogError::ingest("no ingest service configured"))?;

        // Resolution can be slow; do not hold the lock across it.
        let details = ingestor.resolve(link).await?;

        let mut guard = self.snapshot.write().await;
        let id = guard.fresh_id();
        let product = details.into_product(id, link)?;
        let next = guard.with_prepended(product.clone());
        *guard = next;

        tracing::info!(id = %product.id(), link = %link, "product added");
        Ok(product)
    }

    async fn delete_product(&self, id: &ProductId) -> CatalogResult<()> {
        let mut guard = self.snapshot.write().await;
        let remaining = guard.without(id).ok_or_else(|| CatalogError::not_found(id.clone()))?;
        *guard = remaining;

        tracing::info!(id = %id, "product deleted");
        Ok(())
    }
}
