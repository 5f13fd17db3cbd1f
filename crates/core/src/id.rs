//! Strongly-typed identifiers used across the catalog.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Length of generated product ids (hex characters).
const GENERATED_ID_LEN: usize = 8;

/// Identifier of a product within a catalog.
///
/// Opaque to clients: any non-blank string a catalog source hands out is a
/// valid id (static documents commonly use `"1"`, `"2"`, ...). Ids generated by
/// this workspace are short lowercase hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid product id: {0:?}")]
pub struct InvalidProductId(pub String);

impl ProductId {
    /// Wrap an existing identifier. Surrounding whitespace is trimmed.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidProductId> {
        let raw = id.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(InvalidProductId(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generate a fresh short identifier from a random UUIDv4.
    ///
    /// Uniqueness within a catalog is the caller's responsibility; see
    /// `CatalogSnapshot::fresh_id`.
    pub fn generate() -> Self {
        let mut hex = Uuid::new_v4().simple().to_string();
        hex.truncate(GENERATED_ID_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProductId {
    type Err = InvalidProductId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProductId {
    type Error = InvalidProductId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductId> for String {
    fn from(value: ProductId) -> Self {
        value.0
    }
}
