use anyhow::Context;

use storefront_catalog::{CatalogClient, CatalogRefresher, ClientConfig, RefreshStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    storefront_observability::init();

    let config = ClientConfig::from_env().context("invalid catalog client configuration")?;
    tracing::info!(source = %config.source, poll_secs = config.poll_interval.as_secs(), "starting catalog sync");

    let refresher = CatalogRefresher::new(CatalogClient::from_config(&config));
    let mut views = refresher.subscribe();
    let handle = refresher.spawn(config.poll_interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                match &view.status {
                    RefreshStatus::Ready => tracing::info!(
                        version = view.version,
                        products = view.snapshot.len(),
                        "catalog view ready"
                    ),
                    RefreshStatus::Error(message) => tracing::warn!(
                        version = view.version,
                        error = %message,
                        "catalog view stale"
                    ),
                    RefreshStatus::Fetching => {}
                }
            }
        }
    }

    handle.stop().await;
    Ok(())
}
