//! Ingestion: turning a submitted link into product details.
//!
//! Extraction (page scraping, review writing) lives in a separate ingest
//! service; this module only defines the seam and an HTTP client for it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use storefront_core::{CatalogError, CatalogResult, ProductDetails, SourceLink};

use crate::wire::{self, LinkRequest};

/// Resolves links into product details. Failures are `CatalogError::Ingest`.
#[async_trait]
pub trait Ingestor: Send + Sync {
    async fn resolve(&self, link: &SourceLink) -> CatalogResult<ProductDetails>;
}

/// Ingest service reached by `POST <endpoint>` with `{"url": ...}`.
#[derive(Debug, Clone)]
pub struct HttpIngestor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIngestor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Ingestor for HttpIngestor {
    async fn resolve(&self, link: &SourceLink) -> CatalogResult<ProductDetails> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&LinkRequest { url: link.as_str() })
            .send()
            .await
            .map_err(|e| CatalogError::ingest(format!("ingest service unreachable: {e}")))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CatalogError::ingest(format!("ingest service response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(CatalogError::ingest(format!(
                "ingest service returned {status}: {}",
                wire::describe_error_body(&bytes)
            )));
        }

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::ingest(format!("ingest service sent invalid JSON: {e}")))?;
        if let Some(reason) = wire::error_sentinel(&value) {
            return Err(CatalogError::ingest(reason));
        }

        let details: ProductDetails = serde_json::from_value(value)
            .map_err(|e| CatalogError::ingest(format!("unexpected ingest response: {e}")))?;
        tracing::debug!(link = %link, title = %details.title, "link resolved");
        Ok(details)
    }
}
