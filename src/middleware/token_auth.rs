//! Token authentication middleware.
//!
//! Accepts both header styles REST clients use:
//! - `Authorization: Token {token}`
//! - `Authorization: Bearer {token}`
//!
//! Requests without credentials continue as an anonymous [`Viewer`].
//! Requests with a bad token are rejected outright, even on public routes.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::db::{self, UserRole};
use crate::{error::Error, AppState};

/// Authenticated user injected into request extensions.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: UserRole,
    /// Token used for this request (revoked on logout).
    pub token_id: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// The possibly anonymous user making a request.
#[derive(Clone, Debug, Default)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.user_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// Token from the Authorization header.
///
/// `None` means no credentials were sent; `Some("")` is a credential
/// header with nothing after the keyword and is treated as invalid.
fn extract_token(req: &Request<Body>) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?.trim();

    let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(rest.trim().to_string())
    } else {
        None
    }
}

/// Middleware resolving the [`Viewer`] for every API request.
///
/// On success the viewer, and for authenticated requests the
/// [`AuthUser`], are inserted into request extensions.
///
/// # Errors
///
/// Returns 401 Unauthorized if a token is present but unknown, revoked,
/// malformed, or belongs to an inactive user.
pub async fn resolve_viewer(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Error> {
    let viewer = match extract_token(&req) {
        None => Viewer(None),
        Some(token) => {
            let (token_id, user) = state.auth.validate_token(&token).await.map_err(|e| {
                debug!(error = %e, "Token rejected");
                e
            })?;

            // Record use in the background
            let pool = state.db.clone();
            let id = token_id.clone();
            tokio::spawn(async move {
                if let Err(e) = db::touch_auth_token(&pool, &id).await {
                    warn!(token_id = %id, error = %e, "Failed to record token use");
                }
            });

            Viewer(Some(AuthUser {
                user_id: user.id,
                role: user.role_enum(),
                token_id,
            }))
        }
    };

    if let Some(user) = &viewer.0 {
        req.extensions_mut().insert(user.clone());
    }
    req.extensions_mut().insert(viewer);

    Ok(next.run(req).await)
}

/// Middleware that requires an authenticated user.
///
/// Must be used AFTER `resolve_viewer`.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{middleware, routing::get, Router};
/// use foodgram::middleware::require_auth;
///
/// let app = Router::new()
///     .route("/users/me/", get(me).layer(middleware::from_fn(require_auth)));
/// ```
pub async fn require_auth(req: Request<Body>, next: Next) -> Result<Response, Error> {
    if req.extensions().get::<AuthUser>().is_none() {
        return Err(Error::Unauthenticated);
    }
    Ok(next.run(req).await)
}
