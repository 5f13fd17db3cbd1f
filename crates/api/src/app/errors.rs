use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use storefront_core::CatalogError;

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("admin login is not configured")]
    LoginDisabled,

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Catalog(err) => catalog_error_to_response(err),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "unauthorized", "admin token required"),
            ApiError::LoginDisabled => json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "login_disabled",
                "admin login is not configured",
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
            }
        }
    }
}

pub fn catalog_error_to_response(err: CatalogError) -> Response {
    let message = err.to_string();
    match err {
        CatalogError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        CatalogError::Ingest(reason) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "ingest_failed", reason),
        CatalogError::Unsupported(_) => json_error(StatusCode::METHOD_NOT_ALLOWED, "unsupported", message),
        CatalogError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "unauthorized", message),
        CatalogError::Fetch(_) => json_error(StatusCode::BAD_GATEWAY, "upstream_error", message),
        CatalogError::Storage(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "catalog could not be saved"),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
