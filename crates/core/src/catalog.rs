//! Catalog snapshots: immutable, ordered, id-unique product sequences.

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::CatalogError;
use crate::id::ProductId;
use crate::product::{Product, ProductRecord};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("duplicate product id {0} in catalog")]
pub struct DuplicateProductId(pub ProductId);

/// Point-in-time copy of the catalog.
///
/// Order is meaningful (newest first when built from add operations) and ids are
/// unique. On the wire a snapshot is either a JSON array of products or a JSON
/// object keyed by product id; both decode to the same type, preserving
/// document order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogSnapshot {
    products: Vec<Product>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products(products: Vec<Product>) -> Result<Self, DuplicateProductId> {
        let mut seen = HashSet::with_capacity(products.len());
        for p in &products {
            if !seen.insert(p.id()) {
                return Err(DuplicateProductId(p.id().clone()));
            }
        }
        Ok(Self { products })
    }

    /// Decode either wire shape. Any failure is a `CatalogError::Fetch`.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CatalogError> {
        serde_json::from_slice(bytes).map_err(|e| CatalogError::fetch(format!("invalid catalog document: {e}")))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.products.iter()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn into_products(self) -> Vec<Product> {
        self.products
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id() == id)
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ProductId> + '_ {
        self.products.iter().map(Product::id)
    }

    /// New snapshot with `product` first. An older entry with the same id is dropped.
    pub fn with_prepended(&self, product: Product) -> Self {
        let mut products = Vec::with_capacity(self.products.len() + 1);
        let id = product.id().clone();
        products.push(product);
        products.extend(self.products.iter().filter(|p| *p.id() != id).cloned());
        Self { products }
    }

    /// New snapshot without `id`, or `None` if it was not present.
    pub fn without(&self, id: &ProductId) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        Some(Self {
            products: self.products.iter().filter(|p| p.id() != id).cloned().collect(),
        })
    }

    /// A generated id not already used in this snapshot.
    pub fn fresh_id(&self) -> ProductId {
        loop {
            let id = ProductId::generate();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Id-keyed object view, the static-document format.
    pub fn as_document(&self) -> CatalogDocument<'_> {
        CatalogDocument(self)
    }
}

impl<'a> IntoIterator for &'a CatalogSnapshot {
    type Item = &'a Product;
    type IntoIter = std::slice::Iter<'a, Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.iter()
    }
}

impl Serialize for CatalogSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.products)
    }
}

/// Serializes a snapshot as `{ "<id>": Product, ... }` in snapshot order.
pub struct CatalogDocument<'a>(&'a CatalogSnapshot);

impl Serialize for CatalogDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.products.iter().map(|p| (p.id().as_str(), p)))
    }
}

impl<'de> Deserialize<'de> for CatalogSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SnapshotVisitor)
    }
}

struct SnapshotVisitor;

impl<'de> Visitor<'de> for SnapshotVisitor {
    type Value = CatalogSnapshot;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of products or an object of products keyed by id")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut products = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(product) = seq.next_element::<Product>()? {
            products.push(product);
        }
        CatalogSnapshot::from_products(products).map_err(de::Error::custom)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut products = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            let record: ProductRecord = map.next_value()?;
            // The key is authoritative; an embedded `id` is informational only.
            let id = ProductId::new(key).map_err(de::Error::custom)?;
            products.push(record.into_product(id).map_err(de::Error::custom)?);
        }
        CatalogSnapshot::from_products(products).map_err(de::Error::custom)
    }
}
