//! Read-only catalog backed by a generated JSON document (`products.json`).

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;

use storefront_core::{CatalogError, CatalogResult, CatalogSnapshot, Product, ProductId, SourceLink};

use crate::source::{CatalogSource, SourceCapabilities};
use crate::wire;

/// Where the document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticLocation {
    /// Fetched over HTTP with a cache-busting `t` query parameter.
    Remote(String),
    Local(PathBuf),
}

impl StaticLocation {
    /// `http(s)://` locations are remote; anything else is a filesystem path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Remote(raw.to_string())
        } else {
            Self::Local(PathBuf::from(raw))
        }
    }
}

impl core::fmt::Display for StaticLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StaticLocation::Remote(url) => f.write_str(url),
            StaticLocation::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Static-document catalog. Writes are unsupported.
#[derive(Debug, Clone)]
pub struct StaticCatalogSource {
    location: StaticLocation,
    client: reqwest::Client,
}

impl StaticCatalogSource {
    pub fn new(location: StaticLocation) -> Self {
        Self::with_client(reqwest::Client::new(), location)
    }

    pub fn with_client(client: reqwest::Client, location: StaticLocation) -> Self {
        Self { location, client }
    }

    pub fn location(&self) -> &StaticLocation {
        &self.location
    }

    async fn fetch_document(&self) -> CatalogResult<Vec<u8>> {
        match &self.location {
            StaticLocation::Remote(url) => {
                let cache_buster = Utc::now().timestamp_millis().to_string();
                let resp = self
                    .client
                    .get(url)
                    .query(&[("t", cache_buster.as_str())])
                    .send()
                    .await
                    .map_err(|e| CatalogError::fetch(format!("GET {url}: {e}")))?;

                let status = resp.status();
                let bytes = resp
                    .bytes()
                    .await
                    .map_err(|e| CatalogError::fetch(format!("GET {url}: failed to read body: {e}")))?;
                if !status.is_success() {
                    return Err(CatalogError::fetch(format!(
                        "GET {url} returned {status}: {}",
                        wire::describe_error_body(&bytes)
                    )));
                }
                Ok(bytes.to_vec())
            }
            StaticLocation::Local(path) => tokio::fs::read(path)
                .await
                .map_err(|e| CatalogError::fetch(format!("failed to read {}: {e}", path.display()))),
        }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::READ_ONLY
    }

    async fn list_products(&self) -> CatalogResult<CatalogSnapshot> {
        let bytes = self.fetch_document().await?;
        let snapshot = CatalogSnapshot::from_json_slice(&bytes)?;
        tracing::debug!(location = %self.location, products = snapshot.len(), "loaded static catalog");
        Ok(snapshot)
    }

    async fn get_product(&self, id: &ProductId) -> CatalogResult<Product> {
        self.list_products()
            .await?
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(id.clone()))
    }

    async fn add_product(&self, _link: &SourceLink) -> CatalogResult<Product> {
        Err(CatalogError::Unsupported("add_product on a static catalog"))
    }

    async fn delete_product(&self, _id: &ProductId) -> CatalogResult<()> {
        Err(CatalogError::Unsupported("delete_product on a static catalog"))
    }
}
