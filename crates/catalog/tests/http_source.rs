//! `HttpCatalogSource` against a stub server that speaks the legacy dialect:
//! id-keyed list bodies and `{"error": ...}` sentinels with HTTP 200.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use storefront_catalog::{CatalogClient, CatalogSource, HttpCatalogSource, RetryPolicy};
use storefront_core::{CatalogError, ProductId};

const TOKEN: &str = "test-admin-token";

#[derive(Clone, Default)]
struct Legacy {
    /// Ordered (id, record) pairs; served as an id-keyed object.
    products: Arc<Mutex<Vec<(String, Value)>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn list(State(state): State<Legacy>) -> impl IntoResponse {
    // Written by hand so the document keeps insertion order.
    let products = state.products.lock().unwrap();
    let entries: Vec<String> = products
        .iter()
        .map(|(id, record)| format!("{}:{}", Value::String(id.clone()), record))
        .collect();
    (
        [(header::CONTENT_TYPE, "application/json")],
        format!("{{{}}}", entries.join(",")),
    )
}

async fn get_one(State(state): State<Legacy>, Path(id): Path<String>) -> Json<Value> {
    let products = state.products.lock().unwrap();
    match products.iter().find(|(k, _)| *k == id) {
        Some((_, record)) => Json(record.clone()),
        None => Json(json!({"error": "Product not found"})),
    }
}

async fn add(State(state): State<Legacy>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let url = body["url"].as_str().unwrap_or_default().to_string();
    if url.contains("unparseable") {
        return Json(json!({"error": "Failed to parse product", "detail": "no title found"})).into_response();
    }
    let record = json!({
        "id": "abcd1234",
        "title": "Gadget",
        "price": "$19.99",
        "image": "/g.png",
        "url": url,
        "review": "Solid."
    });
    state.products.lock().unwrap().insert(0, ("abcd1234".to_string(), record.clone()));
    Json(record).into_response()
}

async fn delete_one(State(state): State<Legacy>, headers: HeaderMap, Path(id): Path<String>) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    let mut products = state.products.lock().unwrap();
    let before = products.len();
    products.retain(|(k, _)| *k != id);
    if products.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

struct StubServer {
    addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl StubServer {
    async fn spawn(state: Legacy) -> Self {
        let app = Router::new()
            .route("/products", get(list))
            .route("/product/:id", get(get_one).delete(delete_one))
            .route("/add-product", post(add))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, handle }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn widget_state() -> Legacy {
    let state = Legacy::default();
    state.products.lock().unwrap().push((
        "1".to_string(),
        json!({"title": "Widget", "price": "$9.99", "image": "/w.png", "url": "https://amazon.com/w"}),
    ));
    state
}

fn id(raw: &str) -> ProductId {
    ProductId::new(raw).unwrap()
}

#[tokio::test]
async fn reads_id_keyed_catalog_and_sentinels() {
    let server = StubServer::spawn(widget_state()).await;
    let source = HttpCatalogSource::new(format!("{}/", server.base_url()));

    let snapshot = source.list_products().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    let widget = snapshot.get(&id("1")).unwrap();
    assert_eq!(widget.title(), "Widget");
    assert_eq!(widget.price(), "$9.99");

    let fetched = source.get_product(&id("1")).await.unwrap();
    assert_eq!(&fetched, widget);

    let missing = source.get_product(&id("2")).await.unwrap_err();
    assert_eq!(missing, CatalogError::not_found(id("2")));
}

#[tokio::test]
async fn writes_round_trip_through_the_client() {
    let server = StubServer::spawn(widget_state()).await;
    let source = HttpCatalogSource::new(server.base_url()).with_admin_token(TOKEN);
    let client = CatalogClient::new(Arc::new(source)).with_retry(RetryPolicy::none());

    let gadget = client.add_product("https://amazon.com/dp/ABC123").await.unwrap();
    assert_eq!(gadget.title(), "Gadget");
    assert_eq!(gadget.price(), "$19.99");
    assert_eq!(gadget.review(), Some("Solid."));

    let ids: Vec<String> = client
        .list_products()
        .await
        .unwrap()
        .ids()
        .map(ToString::to_string)
        .collect();
    assert_eq!(ids, vec![gadget.id().to_string(), "1".to_string()]);

    client.delete_product(gadget.id()).await.unwrap();
    assert_eq!(
        client.delete_product(gadget.id()).await.unwrap_err(),
        CatalogError::not_found(gadget.id().clone())
    );
    assert_eq!(
        client.get_product(gadget.id()).await.unwrap_err(),
        CatalogError::not_found(gadget.id().clone())
    );
}

#[tokio::test]
async fn ingest_sentinel_is_an_ingest_error() {
    let server = StubServer::spawn(widget_state()).await;
    let client = CatalogClient::new(Arc::new(HttpCatalogSource::new(server.base_url()).with_admin_token(TOKEN)));

    let err = client.add_product("https://amazon.com/unparseable").await.unwrap_err();
    assert_eq!(err, CatalogError::ingest("no title found"));
    assert_eq!(client.list_products().await.unwrap().len(), 1);
}

#[tokio::test]
async fn writes_without_a_token_are_unauthorized() {
    let server = StubServer::spawn(widget_state()).await;
    let client = CatalogClient::new(Arc::new(HttpCatalogSource::new(server.base_url())));

    assert_eq!(
        client.add_product("https://amazon.com/dp/ABC123").await.unwrap_err(),
        CatalogError::Unauthorized
    );
    assert_eq!(client.delete_product(&id("1")).await.unwrap_err(), CatalogError::Unauthorized);
}

#[tokio::test]
async fn unreachable_service_is_a_fetch_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = CatalogClient::new(Arc::new(HttpCatalogSource::new(format!("http://{addr}"))))
        .with_retry(RetryPolicy::none());
    assert!(matches!(client.list_products().await, Err(CatalogError::Fetch(_))));
}

#[tokio::test]
async fn ids_with_reserved_characters_are_escaped() {
    let state = Legacy::default();
    for raw in ["a#b", "a?b", "50%off"] {
        state.products.lock().unwrap().push((
            raw.to_string(),
            json!({"title": raw, "price": "$1", "image": "/i.png", "url": "https://amazon.com/x"}),
        ));
    }
    let server = StubServer::spawn(state).await;
    let source = HttpCatalogSource::new(server.base_url()).with_admin_token(TOKEN);

    let listed: Vec<String> = source.list_products().await.unwrap().ids().map(ToString::to_string).collect();
    assert_eq!(listed, vec!["a#b", "a?b", "50%off"]);

    for raw in ["a#b", "a?b", "50%off"] {
        let product = source.get_product(&id(raw)).await.unwrap();
        assert_eq!(product.id(), &id(raw));
        assert_eq!(product.title(), raw);
    }

    source.delete_product(&id("a?b")).await.unwrap();
    let remaining: Vec<String> = source.list_products().await.unwrap().ids().map(ToString::to_string).collect();
    assert_eq!(remaining, vec!["a#b", "50%off"]);
}
