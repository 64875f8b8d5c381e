//! API Routes for Foodgram
//!
//! This module combines all API routes into a single router.
//! Routes keep the trailing-slash paths REST clients of the service use.

mod auth;
mod ingredients;
pub mod pagination;
mod recipes;
mod render;
pub mod status;
mod tags;
mod users;

use axum::extract::{FromRequest, FromRequestParts};
use axum::Router;

use crate::middleware::resolve_viewer;
use crate::{AppState, Error};

pub use users::{create_account, RegisterRequest};

/// JSON body extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Query string extractor (repeated keys allowed) with JSON rejections.
#[derive(FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

/// Path extractor; unparseable ids answer 404.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

/// Build the complete API router.
///
/// Route structure:
/// - /api/auth/token/* - Token login and logout
/// - /api/users/* - Registration, profiles, password, subscriptions
/// - /api/tags/*, /api/ingredients/* - Reference data (read-only)
/// - /api/recipes/* - Recipes, favorites, shopping cart
/// - /health* - Health checks (public)
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health and status endpoints (no viewer resolution)
        .merge(status::routes())
        .merge(api_routes(state))
}

/// Routes under /api. Every request gets a resolved viewer.
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(tags::routes())
        .merge(ingredients::routes())
        .merge(recipes::routes())
        .layer(axum::middleware::from_fn_with_state(state, resolve_viewer))
}
