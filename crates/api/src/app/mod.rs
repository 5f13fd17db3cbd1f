//! HTTP application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP handlers (one file per area)
//! - `dto.rs`: request bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use storefront_auth::Hs256Jwt;
use storefront_catalog::{CatalogSource, HttpIngestor, Ingestor};

use crate::config::ApiConfig;
use crate::middleware;
use crate::store::FileCatalogStore;

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogSource>,
    pub jwt: Arc<Hs256Jwt>,
    /// Argon2 PHC hash of the admin password; `None` disables login.
    pub admin_password_hash: Option<Arc<str>>,
}

impl AppState {
    /// Open the catalog file and wire the ingest service from configuration.
    pub async fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let ingestor = match &config.ingest_url {
            Some(url) => {
                let ingestor = HttpIngestor::new(url.clone(), config.ingest_timeout)
                    .context("failed to build ingest client")?;
                Some(Arc::new(ingestor) as Arc<dyn Ingestor>)
            }
            None => None,
        };

        let store = FileCatalogStore::open(&config.catalog_file, ingestor)
            .await
            .with_context(|| format!("failed to open catalog {}", config.catalog_file.display()))?;

        Ok(Self {
            catalog: Arc::new(store),
            jwt: Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes(), config.admin_token_ttl)),
            admin_password_hash: config.admin_password_hash.as_deref().map(Arc::from),
        })
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState, cors: CorsLayer) -> Router {
    let auth_state = middleware::AuthState { jwt: state.jwt.clone() };
    let admin_only = axum::middleware::from_fn_with_state(auth_state, middleware::require_admin);

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/products", get(routes::products::list))
        .route(
            "/product/:id",
            get(routes::products::get_one)
                .merge(delete(routes::products::delete_one).route_layer(admin_only.clone())),
        )
        .route("/add-product", post(routes::products::add).route_layer(admin_only))
        .route("/admin/login", post(routes::admin::login))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the configured origins. `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
