//! Polling refresher: keeps a local catalog view current.
//!
//! The view lives in a `tokio::sync::watch` channel. Consumers subscribe and are
//! woken only when the view actually changes; identical fetches are absorbed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use storefront_core::{CatalogError, CatalogSnapshot, Product, ProductId};

use crate::client::CatalogClient;

/// Shortest polling period `spawn` accepts; smaller values are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    /// No fetch has completed yet.
    Fetching,
    Ready,
    /// Last fetch failed; the previous snapshot is still held.
    Error(String),
}

/// What consumers render from.
#[derive(Debug, Clone)]
pub struct CatalogView {
    pub snapshot: Arc<CatalogSnapshot>,
    /// Bumped every time `snapshot` is replaced.
    pub version: u64,
    pub status: RefreshStatus,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(CatalogSnapshot::new()),
            version: 0,
            status: RefreshStatus::Fetching,
            last_refreshed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Changed,
    Unchanged,
    Failed(CatalogError),
}

#[derive(Debug, Clone)]
pub struct CatalogRefresher {
    client: CatalogClient,
    view: Arc<watch::Sender<CatalogView>>,
    /// Bumped by every local write; a fetch started under an older value is stale.
    writes: Arc<AtomicU64>,
}

impl CatalogRefresher {
    pub fn new(client: CatalogClient) -> Self {
        let (view, _) = watch::channel(CatalogView::default());
        Self {
            client,
            view: Arc::new(view),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogView> {
        self.view.subscribe()
    }

    pub fn current(&self) -> CatalogView {
        self.view.borrow().clone()
    }

    /// Fetch once and fold the result into the view.
    ///
    /// A fetch that overlaps a local write is discarded so the write stays
    /// visible; the next poll reconciles.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let started_at = self.writes.load(Ordering::SeqCst);
        match self.client.list_products().await {
            Ok(fresh) => {
                let mut changed = false;
                let mut stale = false;
                self.view.send_if_modified(|view| {
                    let status_changed = view.status != RefreshStatus::Ready;
                    view.status = RefreshStatus::Ready;
                    view.last_refreshed = Some(Utc::now());
                    if self.writes.load(Ordering::SeqCst) != started_at {
                        stale = true;
                    } else if *view.snapshot != fresh {
                        view.snapshot = Arc::new(fresh);
                        view.version += 1;
                        changed = true;
                    }
                    changed || status_changed
                });
                if stale {
                    tracing::debug!("catalog fetch overlapped a local write, discarded");
                    RefreshOutcome::Unchanged
                } else if changed {
                    tracing::info!(products = self.view.borrow().snapshot.len(), "catalog updated");
                    RefreshOutcome::Changed
                } else {
                    tracing::debug!("catalog unchanged");
                    RefreshOutcome::Unchanged
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "catalog refresh failed, keeping last snapshot");
                let message = e.to_string();
                self.view.send_if_modified(|view| {
                    let next = RefreshStatus::Error(message);
                    if view.status == next {
                        return false;
                    }
                    view.status = next;
                    true
                });
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// Reflect a successful add without waiting for the next poll.
    pub fn apply_added(&self, product: Product) {
        self.view.send_modify(|view| {
            self.writes.fetch_add(1, Ordering::SeqCst);
            view.snapshot = Arc::new(view.snapshot.with_prepended(product));
            view.version += 1;
        });
    }

    /// Reflect a successful delete. Returns whether the product was held.
    pub fn apply_removed(&self, id: &ProductId) -> bool {
        self.view.send_if_modified(|view| match view.snapshot.without(id) {
            Some(remaining) => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                view.snapshot = Arc::new(remaining);
                view.version += 1;
                true
            }
            None => false,
        })
    }

    /// Start polling: one fetch immediately, then one per `interval`.
    ///
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn spawn(&self, interval: Duration) -> RefresherHandle {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(requested_ms = interval.as_millis() as u64, "poll interval too short, using minimum");
        }
        let interval = interval.max(MIN_POLL_INTERVAL);
        let refresher = self.clone();
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let task = tokio::spawn(async move {
            tracing::info!(interval_secs = interval.as_secs(), "catalog refresher started");

            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = signal.notified() => break,
                    _ = ticks.tick() => {
                        // An in-flight fetch is abandoned on shutdown.
                        tokio::select! {
                            _ = signal.notified() => break,
                            _ = refresher.refresh_now() => {}
                        }
                    }
                }
            }

            tracing::info!("catalog refresher stopped");
        });

        RefresherHandle {
            shutdown,
            task: Some(task),
        }
    }
}

/// Owns the polling task. Dropping the handle stops polling.
#[derive(Debug)]
pub struct RefresherHandle {
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl RefresherHandle {
    /// Signal shutdown and wait for the task to exit.
    pub async fn stop(mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "catalog refresher task ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for RefresherHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.shutdown.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use storefront_core::{CatalogResult, SourceLink};

    use crate::client::RetryPolicy;
    use crate::source::{CatalogSource, SourceCapabilities};

    /// Replays scripted list results, repeating the last one.
    struct Scripted {
        script: Mutex<VecDeque<CatalogResult<CatalogSnapshot>>>,
        last: Mutex<CatalogResult<CatalogSnapshot>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: Vec<CatalogResult<CatalogSnapshot>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(Ok(CatalogSnapshot::new())),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogSource for Scripted {
        fn capabilities(&self) -> SourceCapabilities {
            SourceCapabilities::READ_ONLY
        }

        async fn list_products(&self) -> CatalogResult<CatalogSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            if let Some(next) = next {
                *last = next;
            }
            last.clone()
        }

        async fn get_product(&self, id: &ProductId) -> CatalogResult<Product> {
            Err(CatalogError::not_found(id.clone()))
        }

        async fn add_product(&self, _link: &SourceLink) -> CatalogResult<Product> {
            Err(CatalogError::Unsupported("add_product"))
        }

        async fn delete_product(&self, _id: &ProductId) -> CatalogResult<()> {
            Err(CatalogError::Unsupported("delete_product"))
        }
    }

    fn product(id: &str, title: &str) -> Product {
        Product::new(ProductId::new(id).unwrap(), title, "$1", "/i.png", "https://amazon.com/x").unwrap()
    }

    fn snapshot(products: Vec<Product>) -> CatalogSnapshot {
        CatalogSnapshot::from_products(products).unwrap()
    }

    fn refresher(source: Arc<Scripted>) -> CatalogRefresher {
        CatalogRefresher::new(CatalogClient::new(source).with_retry(RetryPolicy::none()))
    }

    #[tokio::test]
    async fn identical_fetches_do_not_replace_the_snapshot() {
        let widget = snapshot(vec![product("1", "Widget")]);
        let source = Scripted::new(vec![Ok(widget.clone()), Ok(widget.clone())]);
        let refresher = refresher(source);
        let mut rx = refresher.subscribe();

        assert_eq!(refresher.refresh_now().await, RefreshOutcome::Changed);
        assert!(rx.has_changed().unwrap());
        let first = rx.borrow_and_update().clone();
        assert_eq!(first.version, 1);
        assert_eq!(first.status, RefreshStatus::Ready);

        assert_eq!(refresher.refresh_now().await, RefreshOutcome::Unchanged);
        assert!(!rx.has_changed().unwrap());
        let second = refresher.current();
        assert_eq!(second.version, 1);
        assert!(Arc::ptr_eq(&first.snapshot, &second.snapshot));
    }

    #[tokio::test]
    async fn failure_keeps_last_good_snapshot() {
        let widget = snapshot(vec![product("1", "Widget")]);
        let gadget = snapshot(vec![product("2", "Gadget"), product("1", "Widget")]);
        let source = Scripted::new(vec![
            Ok(widget.clone()),
            Err(CatalogError::fetch("connection refused")),
            Ok(gadget.clone()),
        ]);
        let refresher = refresher(source);

        refresher.refresh_now().await;
        let outcome = refresher.refresh_now().await;
        assert_eq!(outcome, RefreshOutcome::Failed(CatalogError::fetch("connection refused")));

        let view = refresher.current();
        assert_eq!(*view.snapshot, widget);
        assert_eq!(view.version, 1);
        assert!(matches!(view.status, RefreshStatus::Error(ref m) if m.contains("connection refused")));

        assert_eq!(refresher.refresh_now().await, RefreshOutcome::Changed);
        let view = refresher.current();
        assert_eq!(*view.snapshot, gadget);
        assert_eq!(view.version, 2);
        assert_eq!(view.status, RefreshStatus::Ready);
    }

    #[tokio::test]
    async fn first_failure_leaves_an_empty_catalog_in_error() {
        let source = Scripted::new(vec![Err(CatalogError::fetch("dns failure"))]);
        let refresher = refresher(source);

        refresher.refresh_now().await;
        let view = refresher.current();
        assert!(view.snapshot.is_empty());
        assert_eq!(view.version, 0);
        assert!(matches!(view.status, RefreshStatus::Error(_)));
        assert!(view.last_refreshed.is_none());
    }

    #[tokio::test]
    async fn local_writes_bump_the_version() {
        let source = Scripted::new(vec![Ok(snapshot(vec![product("1", "Widget")]))]);
        let refresher = refresher(source);
        refresher.refresh_now().await;

        refresher.apply_added(product("2", "Gadget"));
        let view = refresher.current();
        assert_eq!(view.version, 2);
        assert_eq!(view.snapshot.ids().map(ProductId::as_str).collect::<Vec<_>>(), vec!["2", "1"]);

        assert!(refresher.apply_removed(&ProductId::new("2").unwrap()));
        assert!(!refresher.apply_removed(&ProductId::new("2").unwrap()));
        assert_eq!(refresher.current().version, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_refresher_polls_until_stopped() {
        let source = Scripted::new(vec![Ok(snapshot(vec![product("1", "Widget")]))]);
        let refresher = refresher(source.clone());
        let mut rx = refresher.subscribe();

        let handle = refresher.spawn(Duration::from_secs(600));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().version, 1);
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_secs(1201)).await;
        assert_eq!(source.calls(), 3);

        handle.stop().await;
        let calls = source.calls();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(source.calls(), calls);
    }

    /// Answers every list after a fixed delay.
    struct Slow {
        delay: Duration,
        snapshot: CatalogSnapshot,
    }

    #[async_trait]
    impl CatalogSource for Slow {
        fn capabilities(&self) -> SourceCapabilities {
            SourceCapabilities::READ_ONLY
        }

        async fn list_products(&self) -> CatalogResult<CatalogSnapshot> {
            tokio::time::sleep(self.delay).await;
            Ok(self.snapshot.clone())
        }

        async fn get_product(&self, id: &ProductId) -> CatalogResult<Product> {
            Err(CatalogError::not_found(id.clone()))
        }

        async fn add_product(&self, _link: &SourceLink) -> CatalogResult<Product> {
            Err(CatalogError::Unsupported("add_product"))
        }

        async fn delete_product(&self, _id: &ProductId) -> CatalogResult<()> {
            Err(CatalogError::Unsupported("delete_product"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_fetch_does_not_undo_a_local_add() {
        let source = Arc::new(Slow {
            delay: Duration::from_millis(100),
            snapshot: snapshot(vec![product("1", "Widget")]),
        });
        let refresher = CatalogRefresher::new(CatalogClient::new(source).with_retry(RetryPolicy::none()));

        let in_flight = tokio::spawn({
            let refresher = refresher.clone();
            async move { refresher.refresh_now().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        refresher.apply_added(product("2", "Gadget"));

        assert_eq!(in_flight.await.unwrap(), RefreshOutcome::Unchanged);
        let view = refresher.current();
        assert_eq!(view.snapshot.ids().map(ProductId::as_str).collect::<Vec<_>>(), vec!["2"]);
        assert_eq!(view.version, 1);

        // A fetch started after the write applies normally.
        assert_eq!(refresher.refresh_now().await, RefreshOutcome::Changed);
        assert_eq!(refresher.current().snapshot.ids().map(ProductId::as_str).collect::<Vec<_>>(), vec!["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_fetch_does_not_undo_a_local_delete() {
        let source = Arc::new(Slow {
            delay: Duration::from_millis(100),
            snapshot: snapshot(vec![product("1", "Widget"), product("2", "Gadget")]),
        });
        let refresher = CatalogRefresher::new(CatalogClient::new(source).with_retry(RetryPolicy::none()));
        refresher.refresh_now().await;

        let in_flight = tokio::spawn({
            let refresher = refresher.clone();
            async move { refresher.refresh_now().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(refresher.apply_removed(&ProductId::new("2").unwrap()));

        assert_eq!(in_flight.await.unwrap(), RefreshOutcome::Unchanged);
        assert_eq!(refresher.current().snapshot.ids().map(ProductId::as_str).collect::<Vec<_>>(), vec!["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_raised_to_the_minimum() {
        let source = Scripted::new(vec![Ok(snapshot(vec![product("1", "Widget")]))]);
        let refresher = refresher(source.clone());

        let handle = refresher.spawn(Duration::ZERO);
        tokio::time::sleep(MIN_POLL_INTERVAL * 3 + Duration::from_millis(500)).await;
        assert_eq!(source.calls(), 4);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_polling() {
        let source = Scripted::new(vec![]);
        let refresher = refresher(source.clone());

        let handle = refresher.spawn(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let calls = source.calls();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(source.calls(), calls);
    }
}
