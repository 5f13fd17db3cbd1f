//! Live catalog service over HTTP.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;

use storefront_core::{CatalogError, CatalogResult, CatalogSnapshot, Product, ProductId, SourceLink};

use crate::source::{CatalogSource, SourceCapabilities};
use crate::wire::{self, LinkRequest};

/// Client for the catalog service's HTTP contract:
///
/// - `GET /products`
/// - `GET /product/{id}`
/// - `POST /add-product` with `{"url": ...}`
/// - `DELETE /product/{id}`
///
/// Both status-code errors and legacy in-band `{"error": ...}` bodies are mapped
/// onto `CatalogError`.
#[derive(Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    base_url: String,
    admin_token: Option<String>,
}

impl std::fmt::Debug for HttpCatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalogSource")
            .field("base_url", &self.base_url)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl HttpCatalogSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            admin_token: None,
        }
    }

    /// Bearer token sent with write requests.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/product/{id}` with the id percent-encoded as one path segment.
    fn product_url(&self, id: &ProductId) -> CatalogResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| CatalogError::fetch(format!("invalid catalog url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| CatalogError::fetch(format!("catalog url {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push("product")
            .push(id.as_str());
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.admin_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

async fn send(req: RequestBuilder, what: &str) -> CatalogResult<Response> {
    req.send()
        .await
        .map_err(|e| CatalogError::fetch(format!("{what}: {e}")))
}

async fn body_bytes(resp: Response, what: &str) -> CatalogResult<Vec<u8>> {
    resp.bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| CatalogError::fetch(format!("{what}: failed to read body: {e}")))
}

fn parse_json(bytes: &[u8], what: &str) -> CatalogResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| CatalogError::fetch(format!("{what}: invalid JSON: {e}")))
}

fn unexpected_status(status: StatusCode, bytes: &[u8], what: &str) -> CatalogError {
    CatalogError::fetch(format!(
        "{what} returned {status}: {}",
        wire::describe_error_body(bytes)
    ))
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::READ_WRITE
    }

    async fn list_products(&self) -> CatalogResult<CatalogSnapshot> {
        let url = self.url("/products");
        let what = format!("GET {url}");

        let resp = send(self.client.get(&url), &what).await?;
        let status = resp.status();
        let bytes = body_bytes(resp, &what).await?;
        if !status.is_success() {
            return Err(unexpected_status(status, &bytes, &what));
        }

        let snapshot = CatalogSnapshot::from_json_slice(&bytes)?;
        tracing::debug!(url = %url, products = snapshot.len(), "fetched catalog");
        Ok(snapshot)
    }

    async fn get_product(&self, id: &ProductId) -> CatalogResult<Product> {
        let url = self.product_url(id)?;
        let what = format!("GET {url}");

        let resp = send(self.client.get(url.clone()), &what).await?;
        let status = resp.status();
        let bytes = body_bytes(resp, &what).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::not_found(id.clone()));
        }
        if !status.is_success() {
            return Err(unexpected_status(status, &bytes, &what));
        }

        let mut value = parse_json(&bytes, &what)?;
        if let Some(reason) = wire::error_sentinel(&value) {
            tracing::debug!(id = %id, reason = %reason, "in-band not-found sentinel");
            return Err(CatalogError::not_found(id.clone()));
        }
        if let Some(obj) = value.as_object_mut() {
            obj.entry("id").or_insert_with(|| Value::String(id.to_string()));
        }

        let product: Product = serde_json::from_value(value)
            .map_err(|e| CatalogError::fetch(format!("{what}: invalid product: {e}")))?;
        if product.id() != id {
            return Err(CatalogError::fetch(format!(
                "{what}: asked for product {id}, received {}",
                product.id()
            )));
        }
        Ok(product)
    }

    async fn add_product(&self, link: &SourceLink) -> CatalogResult<Product> {
        let url = self.url("/add-product");
        let what = format!("POST {url}");

        let req = self.authorize(self.client.post(&url).json(&LinkRequest { url: link.as_str() }));
        let resp = send(req, &what).await?;
        let status = resp.status();
        let bytes = body_bytes(resp, &what).await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CatalogError::Unauthorized);
        }
        if status.is_client_error() {
            return Err(CatalogError::ingest(wire::describe_error_body(&bytes)));
        }
        if !status.is_success() {
            return Err(unexpected_status(status, &bytes, &what));
        }

        let value = parse_json(&bytes, &what)?;
        if let Some(reason) = wire::error_sentinel(&value) {
            return Err(CatalogError::ingest(reason));
        }
        let product: Product = serde_json::from_value(value)
            .map_err(|e| CatalogError::fetch(format!("{what}: invalid product: {e}")))?;

        tracing::info!(id = %product.id(), link = %link, "product added");
        Ok(product)
    }

    async fn delete_product(&self, id: &ProductId) -> CatalogResult<()> {
        let url = self.product_url(id)?;
        let what = format!("DELETE {url}");

        let resp = send(self.authorize(self.client.delete(url.clone())), &what).await?;
        let status = resp.status();
        match status {
            s if s.is_success() => {
                tracing::info!(id = %id, "product deleted");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(CatalogError::not_found(id.clone())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CatalogError::Unauthorized),
            _ => {
                let bytes = body_bytes(resp, &what).await?;
                Err(unexpected_status(status, &bytes, &what))
            }
        }
    }
}
