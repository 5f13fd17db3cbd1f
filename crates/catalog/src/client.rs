//! The catalog client: the four catalog operations with timeouts and retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use storefront_core::{CatalogError, CatalogResult, CatalogSnapshot, Product, ProductId, SourceLink};

use crate::config::{ClientConfig, SourceKind};
use crate::http::HttpCatalogSource;
use crate::source::{CatalogSource, SourceCapabilities};
use crate::static_file::StaticCatalogSource;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Exponential backoff for transient read failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based): doubles each time, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Catalog operations over whichever source was configured.
#[derive(Clone)]
pub struct CatalogClient {
    source: Arc<dyn CatalogSource>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the source selected by `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        let source: Arc<dyn CatalogSource> = match &config.source {
            SourceKind::Http { base_url, admin_token } => {
                let source = HttpCatalogSource::new(base_url.clone());
                match admin_token {
                    Some(token) => Arc::new(source.with_admin_token(token.clone())),
                    None => Arc::new(source),
                }
            }
            SourceKind::StaticFile { location } => Arc::new(StaticCatalogSource::new(location.clone())),
        };
        Self::new(source).with_timeout(config.timeout).with_retry(config.retry)
    }

    pub fn capabilities(&self) -> SourceCapabilities {
        self.source.capabilities()
    }

    /// Full catalog at call time.
    pub async fn list_products(&self) -> CatalogResult<CatalogSnapshot> {
        self.read_with_retry("list_products", || self.source.list_products()).await
    }

    /// One product, or `CatalogError::NotFound`.
    pub async fn get_product(&self, id: &ProductId) -> CatalogResult<Product> {
        self.read_with_retry("get_product", || self.source.get_product(id)).await
    }

    /// Submit a link; returns the stored product with its new id.
    pub async fn add_product(&self, url: &str) -> CatalogResult<Product> {
        let link = SourceLink::parse(url)?;
        self.bounded("add_product", self.source.add_product(&link)).await
    }

    /// Delete by id. A second delete of the same id fails with `NotFound`.
    pub async fn delete_product(&self, id: &ProductId) -> CatalogResult<()> {
        self.bounded("delete_product", self.source.delete_product(id)).await
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = CatalogResult<T>>) -> CatalogResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::fetch(format!("{op} timed out after {:?}", self.timeout))),
        }
    }

    async fn read_with_retry<T, F, Fut>(&self, op: &str, mut call: F) -> CatalogResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CatalogResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match self.bounded(op, call()).await {
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "catalog read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    /// Fails the first `failures` reads with a fetch error; writes always fail.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        delay: Duration,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogSource for Flaky {
        fn capabilities(&self) -> SourceCapabilities {
            SourceCapabilities::READ_WRITE
        }

        async fn list_products(&self) -> CatalogResult<CatalogSnapshot> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if n < self.failures {
                Err(CatalogError::fetch("connection reset"))
            } else {
                Ok(CatalogSnapshot::new())
            }
        }

        async fn get_product(&self, id: &ProductId) -> CatalogResult<Product> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CatalogError::not_found(id.clone()))
        }

        async fn add_product(&self, _link: &SourceLink) -> CatalogResult<Product> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CatalogError::fetch("connection reset"))
        }

        async fn delete_product(&self, _id: &ProductId) -> CatalogResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CatalogError::fetch("connection reset"))
        }
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn transient_reads_are_retried() {
        let source = Arc::new(Flaky::new(2));
        let client = CatalogClient::new(source.clone()).with_retry(fast_retry(2));

        assert!(client.list_products().await.unwrap().is_empty());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let source = Arc::new(Flaky::new(10));
        let client = CatalogClient::new(source.clone()).with_retry(fast_retry(2));

        assert!(matches!(client.list_products().await, Err(CatalogError::Fetch(_))));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn not_found_and_writes_are_not_retried() {
        let source = Arc::new(Flaky::new(0));
        let client = CatalogClient::new(source.clone()).with_retry(fast_retry(5));

        let id = ProductId::new("1").unwrap();
        assert_eq!(client.get_product(&id).await.unwrap_err(), CatalogError::not_found(id.clone()));
        assert_eq!(source.calls(), 1);

        assert!(client.add_product("https://amazon.com/dp/ABC123").await.is_err());
        assert!(client.delete_product(&id).await.is_err());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn malformed_link_never_reaches_the_source() {
        let source = Arc::new(Flaky::new(0));
        let client = CatalogClient::new(source.clone());

        assert!(matches!(client.add_product("not a link").await, Err(CatalogError::Ingest(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn timeout_is_a_fetch_error() {
        let source = Arc::new(Flaky {
            delay: Duration::from_secs(5),
            ..Flaky::new(0)
        });
        let client = CatalogClient::new(source)
            .with_timeout(Duration::from_millis(20))
            .with_retry(RetryPolicy::none());

        let err = client.list_products().await.unwrap_err();
        assert!(matches!(&err, CatalogError::Fetch(msg) if msg.contains("timed out")));
    }
}
