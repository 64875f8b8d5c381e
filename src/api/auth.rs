//! Token authentication routes.
//!
//! Routes:
//! - POST /api/auth/token/login/ - Exchange email and password for a token
//! - POST /api/auth/token/logout/ - Revoke the token used for the request

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiJson;
use crate::error::FieldErrors;
use crate::middleware::{require_auth, AuthUser};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/token/login/", post(login))
        .route(
            "/api/auth/token/logout/",
            post(logout).layer(from_fn(require_auth)),
        )
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

/// POST /api/auth/token/login/
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let mut errors = FieldErrors::new();
    let email = request.email.as_deref().map(str::trim).unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();
    if email.is_empty() {
        errors.add("email", "This field is required.");
    }
    if password.is_empty() {
        errors.add("password", "This field is required.");
    }
    errors.into_result()?;

    let auth_token = state.auth.login(email, password).await?;
    Ok(Json(TokenResponse { auth_token }))
}

/// POST /api/auth/token/logout/
async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.auth.logout(&auth.token_id).await?;
    info!(user_id = auth.user_id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}
