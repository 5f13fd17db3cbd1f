//! File-backed catalog store.
//!
//! The catalog is held in memory and written out as an id-keyed JSON document
//! (the static-document format) after every successful mutation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use storefront_catalog::{CatalogSource, InMemoryCatalogSource, Ingestor, SourceCapabilities};
use storefront_core::{CatalogError, CatalogResult, CatalogSnapshot, Product, ProductId, SourceLink};

/// Catalog service's system of record.
///
/// Mutations write the next document to disk first and only then swap it into
/// memory, so a failed write leaves both untouched.
pub struct FileCatalogStore {
    catalog: InMemoryCatalogSource,
    ingestor: Option<Arc<dyn Ingestor>>,
    path: Arc<Path>,
    /// Serialises mutations together with their write-out. Never held across ingest.
    writes: Arc<Mutex<()>>,
}

impl FileCatalogStore {
    /// Load the document at `path`. A missing file is an empty catalog.
    pub async fn open(path: impl Into<PathBuf>, ingestor: Option<Arc<dyn Ingestor>>) -> CatalogResult<Self> {
        let path: PathBuf = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => CatalogSnapshot::from_json_slice(&bytes)
                .map_err(|e| CatalogError::storage(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "catalog file missing, starting empty");
                CatalogSnapshot::new()
            }
            Err(e) => return Err(CatalogError::storage(format!("failed to read {}: {e}", path.display()))),
        };
        tracing::info!(path = %path.display(), products = snapshot.len(), "catalog loaded");

        Ok(Self {
            catalog: InMemoryCatalogSource::with_snapshot(snapshot),
            ingestor,
            path: path.into(),
            writes: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to the current catalog, persist the result, then publish it.
    ///
    /// The write and the swap run on their own task, so dropping the caller
    /// cannot leave memory and disk out of step.
    async fn mutate<T, F>(&self, change: F) -> CatalogResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&CatalogSnapshot) -> CatalogResult<(CatalogSnapshot, T)>,
    {
        let guard = self.writes.clone().lock_owned().await;
        let (next, value) = change(&self.catalog.snapshot().await)?;

        let catalog = self.catalog.clone();
        let path = self.path.clone();
        let commit = tokio::spawn(async move {
            let _guard = guard;
            write_out(&path, &next).await?;
            catalog.replace(next).await;
            Ok::<_, CatalogError>(())
        });

        match commit.await {
            Ok(Ok(())) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(path = %self.path.display(), error = %e, "catalog write failed, nothing changed");
                Err(e)
            }
            Err(e) => Err(CatalogError::storage(format!("catalog commit task failed: {e}"))),
        }
    }
}

/// Write `snapshot` through a temp file and rename, so readers never see a partial document.
async fn write_out(path: &Path, snapshot: &CatalogSnapshot) -> CatalogResult<()> {
    let body = serde_json::to_vec_pretty(&snapshot.as_document())
        .map_err(|e| CatalogError::storage(format!("failed to encode catalog: {e}")))?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .map_err(|e| CatalogError::storage(format!("failed to write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CatalogError::storage(format!("failed to replace {}: {e}", path.display())))?;
    Ok(())
}

#[async_trait]
impl CatalogSource for FileCatalogStore {
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::READ_WRITE
    }

    async fn list_products(&self) -> CatalogResult<CatalogSnapshot> {
        self.catalog.list_products().await
    }

    async fn get_product(&self, id: &ProductId) -> CatalogResult<Product> {
        self.catalog.get_product(id).await
    }

    async fn add_product(&self, link: &SourceLink) -> CatalogResult<Product> {
        let ingestor = self
            .ingestor
            .as_ref()
            .ok_or_else(|| CatalogError::ingest("no ingest service configured"))?;
        let details = ingestor.resolve(link).await?;

        let product = self
            .mutate(|current| {
                let product = details.into_product(current.fresh_id(), link)?;
                Ok((current.with_prepended(product.clone()), product))
            })
            .await?;

        tracing::info!(id = %product.id(), link = %link, "product added");
        Ok(product)
    }

    async fn delete_product(&self, id: &ProductId) -> CatalogResult<()> {
        self.mutate(|current| {
            let remaining = current.without(id).ok_or_else(|| CatalogError::not_found(id.clone()))?;
            Ok((remaining, ()))
        })
        .await?;

        tracing::info!(id = %id, "product deleted");
        Ok(())
    }
}
