//! Tag routes (read-only, unpaginated).
//!
//! Routes:
//! - GET /api/tags/ - All tags
//! - GET /api/tags/:id/ - One tag

use axum::{extract::State, routing::get, Json, Router};

use super::ApiPath;
use crate::db::{self, Tag};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tags/", get(list_tags))
        .route("/api/tags/:id/", get(get_tag))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>> {
    Ok(Json(db::list_tags(&state.db).await?))
}

async fn get_tag(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<Json<Tag>> {
    Ok(Json(db::get_tag(&state.db, id).await?))
}
