//! Admin login backend.
//!
//! `POST /api/admin/login` exchanges the operator credentials for an opaque
//! token; `GET /api/admin/me` resolves a `Bearer` token back to the operator.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use yard_patrol_core::UserRecord;

use crate::error::{AppError, Result};
use crate::services::admin_api::LoginResponse;
use crate::state::AppState;

/// Body of `POST /api/admin/login`.
#[derive(Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Issue an admin token.
///
/// Failures answer 401 with `{"message": "Invalid credentials"}`.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginRequest>,
) -> Result<Json<LoginResponse>> {
    let token = state
        .admin_auth()
        .issue_token(&body.username, &SecretString::from(body.password))
        .await?;

    Ok(Json(LoginResponse {
        token: token.into_inner(),
    }))
}

/// Resolve the `Bearer` token to the operator record.
#[instrument(skip_all)]
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<UserRecord>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    state
        .admin_auth()
        .authorize(token)
        .await
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
