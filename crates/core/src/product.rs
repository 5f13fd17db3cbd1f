//! The product record and the inputs it is built from.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CatalogError;
use crate::id::ProductId;

/// A product was missing a required field or carried an invalid one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid product: {0}")]
pub struct InvalidProduct(pub String);

/// A catalog entry.
///
/// Products are never mutated in place; catalog changes replace whole records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProductRecord")]
pub struct Product {
    id: ProductId,
    title: String,
    price: String,
    image: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<String>,
}

impl Product {
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        price: impl Into<String>,
        image: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, InvalidProduct> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(InvalidProduct(format!("product {id} has an empty title")));
        }
        Ok(Self {
            id,
            title,
            price: price.into(),
            image: image.into(),
            url: url.into(),
            review: None,
        })
    }

    /// Attach review text. Blank text means "no review".
    pub fn with_review(mut self, review: impl Into<String>) -> Self {
        self.review = normalize_review(Some(review.into()));
        self
    }

    pub fn id(&self) -> &ProductId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Display-formatted price, e.g. `"£19.99"`.
    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Outbound affiliate link.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn review(&self) -> Option<&str> {
        self.review.as_deref()
    }
}

fn normalize_review(review: Option<String>) -> Option<String> {
    review.filter(|r| !r.trim().is_empty())
}

/// Loose wire shape of a product.
///
/// `id` is optional because id-keyed documents carry the id as the map key.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProductRecord {
    #[serde(default)]
    pub(crate) id: Option<String>,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) price: String,
    #[serde(default)]
    pub(crate) image: String,
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) review: Option<String>,
}

impl ProductRecord {
    pub(crate) fn into_product(self, id: ProductId) -> Result<Product, InvalidProduct> {
        let product = Product::new(id, self.title, self.price, self.image, self.url)?;
        Ok(Product {
            review: normalize_review(self.review),
            ..product
        })
    }
}

impl TryFrom<ProductRecord> for Product {
    type Error = InvalidProduct;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        let raw_id = record
            .id
            .clone()
            .ok_or_else(|| InvalidProduct("missing id".to_string()))?;
        let id = ProductId::new(raw_id).map_err(|e| InvalidProduct(e.to_string()))?;
        record.into_product(id)
    }
}

/// What the ingest collaborator resolves a submitted link into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub title: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub review: Option<String>,
}

impl ProductDetails {
    /// Turn resolved details into a catalog entry for `link`.
    pub fn into_product(self, id: ProductId, link: &SourceLink) -> Result<Product, CatalogError> {
        let product = Product::new(id, self.title, self.price, self.image, link.as_str())
            .map_err(|e| CatalogError::ingest(format!("{} did not resolve: {e}", link)))?;
        Ok(match self.review {
            Some(review) => product.with_review(review),
            None => product,
        })
    }
}

/// A validated link submitted for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SourceLink(String);

impl SourceLink {
    /// Accepts absolute `http`/`https` links with a host.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let link = raw.trim();
        let rest = link
            .strip_prefix("https://")
            .or_else(|| link.strip_prefix("http://"))
            .ok_or_else(|| CatalogError::ingest(format!("not an http(s) link: {raw:?}")))?;

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || link.chars().any(char::is_whitespace) {
            return Err(CatalogError::ingest(format!("malformed link: {raw:?}")));
        }

        Ok(Self(link.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SourceLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> ProductId {
        ProductId::new(s).unwrap()
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = Product::new(id("1"), "  ", "$1", "/i.png", "https://a.test").unwrap_err();
        assert!(err.0.contains("empty title"));
    }

    #[test]
    fn empty_review_is_treated_as_absent() {
        let p = Product::new(id("1"), "Widget", "$9.99", "/w.png", "https://amazon.com/w")
            .unwrap()
            .with_review("   ");
        assert_eq!(p.review(), None);

        let value = serde_json::to_value(&p).unwrap();
        assert!(value.get("review").is_none());
    }

    #[test]
    fn deserializes_full_record() {
        let p: Product = serde_json::from_value(json!({
            "id": "1",
            "title": "Widget",
            "price": "$9.99",
            "image": "/w.png",
            "url": "https://amazon.com/w",
            "review": "Lovely."
        }))
        .unwrap();

        assert_eq!(p.id().as_str(), "1");
        assert_eq!(p.title(), "Widget");
        assert_eq!(p.price(), "$9.99");
        assert_eq!(p.image(), "/w.png");
        assert_eq!(p.url(), "https://amazon.com/w");
        assert_eq!(p.review(), Some("Lovely."));
    }

    #[test]
    fn deserializing_without_id_fails() {
        let res: Result<Product, _> = serde_json::from_value(json!({
            "title": "Widget",
            "url": "https://amazon.com/w"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn source_link_validation() {
        assert!(SourceLink::parse("https://amazon.com/dp/ABC123").is_ok());
        assert!(SourceLink::parse("  http://amzn.to/x  ").is_ok());
        assert!(matches!(SourceLink::parse("ftp://x"), Err(CatalogError::Ingest(_))));
        assert!(matches!(SourceLink::parse("https://"), Err(CatalogError::Ingest(_))));
        assert!(matches!(SourceLink::parse("https://a b"), Err(CatalogError::Ingest(_))));
        assert!(matches!(SourceLink::parse(""), Err(CatalogError::Ingest(_))));
    }

    #[test]
    fn details_become_a_product_for_the_link() {
        let link = SourceLink::parse("https://amazon.com/dp/ABC123").unwrap();
        let details = ProductDetails {
            title: "Gadget".to_string(),
            price: "$19.99".to_string(),
            image: "/g.png".to_string(),
            review: Some("Handy.".to_string()),
        };

        let p = details.into_product(id("abc"), &link).unwrap();
        assert_eq!(p.url(), "https://amazon.com/dp/ABC123");
        assert_eq!(p.title(), "Gadget");
        assert_eq!(p.review(), Some("Handy."));
    }

    #[test]
    fn untitled_details_are_an_ingest_failure() {
        let link = SourceLink::parse("https://amazon.com/dp/ABC123").unwrap();
        let details = ProductDetails {
            title: String::new(),
            price: String::new(),
            image: String::new(),
            review: None,
        };
        assert!(matches!(details.into_product(id("abc"), &link), Err(CatalogError::Ingest(_))));
    }
}
