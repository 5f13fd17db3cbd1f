use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use storefront_core::{CatalogSnapshot, Product, ProductId, SourceLink};

use crate::app::AppState;
use crate::app::dto::AddProductRequest;
use crate::app::errors::ApiError;
use crate::context::AdminContext;

fn parse_id(raw: String) -> Result<ProductId, ApiError> {
    ProductId::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// `GET /products`: the whole catalog, newest first.
pub async fn list(State(state): State<AppState>) -> Result<Json<CatalogSnapshot>, ApiError> {
    Ok(Json(state.catalog.list_products().await?))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>, ApiError> {
    let id = parse_id(id)?;
    Ok(Json(state.catalog.get_product(&id).await?))
}

/// `POST /add-product` with `{"url": ...}`.
pub async fn add(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    body: Result<Json<AddProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let link = SourceLink::parse(&req.url)?;

    let product = state.catalog.add_product(&link).await?;
    tracing::info!(admin = admin.subject(), id = %product.id(), "admin added product");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn delete_one(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(id)?;
    state.catalog.delete_product(&id).await?;
    tracing::info!(admin = admin.subject(), id = %id, "admin deleted product");
    Ok(StatusCode::NO_CONTENT)
}
