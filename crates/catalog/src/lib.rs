//! `storefront-catalog`
//!
//! **Responsibility:** catalog synchronization and lookup.
//!
//! This crate provides:
//! - The `CatalogSource` abstraction with HTTP, static-document and in-memory sources
//! - The `Ingestor` seam for resolving submitted links
//! - `CatalogClient` (timeouts, retry with backoff)
//! - `CatalogRefresher` (polling, change detection, cancellable task)

pub mod client;
pub mod config;
pub mod http;
pub mod ingest;
pub mod memory;
pub mod refresher;
pub mod source;
pub mod static_file;
pub mod wire;

pub use client::{CatalogClient, RetryPolicy};
pub use config::{ClientConfig, ConfigError, SourceKind};
pub use http::HttpCatalogSource;
pub use ingest::{HttpIngestor, Ingestor};
pub use memory::InMemoryCatalogSource;
pub use refresher::{CatalogRefresher, CatalogView, RefreshOutcome, RefreshStatus, RefresherHandle};
pub use source::{CatalogSource, SourceCapabilities};
pub use static_file::{StaticCatalogSource, StaticLocation};
