//! Foodgram - recipe sharing service
//!
//! Users publish recipes, follow authors, keep favorites and download a
//! shopping list aggregated over the recipes in their cart.
//!
//! Library exports for the binary and for integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
pub mod validation;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use config::config;
pub use error::{Error, Result};
pub use state::AppState;

/// Build the HTTP application: API routes, media files and shared layers.
pub fn router(state: AppState) -> Router {
    let media = ServeDir::new(&state.config.media.root);
    let media_prefix = state.config.media.url.trim_end_matches('/').to_string();
    let max_body_size = state.config.server.max_body_size;

    let app = Router::new().merge(api::routes(state.clone()));
    let app = if media_prefix.is_empty() {
        app.fallback_service(media)
    } else {
        app.nest_service(&media_prefix, media)
    };

    app.layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
