use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;

use storefront_auth::{IssuedToken, verify_password};

use crate::app::AppState;
use crate::app::dto::LoginRequest;
use crate::app::errors::ApiError;

/// Subject recorded in issued admin tokens.
const ADMIN_SUBJECT: &str = "admin";

/// `POST /admin/login` with `{"password": ...}`: exchange the admin password for a token.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<IssuedToken>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let hash = state.admin_password_hash.clone().ok_or(ApiError::LoginDisabled)?;

    // Argon2 verification blocks; run it off the async workers.
    let verified = tokio::task::spawn_blocking(move || verify_password(&req.password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password check panicked: {e}")))?
        .map_err(|e| ApiError::Internal(format!("ADMIN_PASSWORD_HASH is unusable: {e}")))?;

    if !verified {
        tracing::warn!("admin login rejected");
        return Err(ApiError::Unauthorized);
    }

    let issued = state
        .jwt
        .issue(ADMIN_SUBJECT, Utc::now())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    tracing::info!(expires_at = %issued.expires_at, "admin logged in");
    Ok(Json(issued))
}
