//! Ingredient routes (read-only, unpaginated).
//!
//! Routes:
//! - GET /api/ingredients/?name=<prefix> - Ingredients, optionally by name prefix
//! - GET /api/ingredients/:id/ - One ingredient

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;

use super::{ApiPath, ApiQuery};
use crate::db::{self, Ingredient};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ingredients/", get(list_ingredients))
        .route("/api/ingredients/:id/", get(get_ingredient))
}

#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    /// Case-sensitive name prefix.
    pub name: Option<String>,
}

async fn list_ingredients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>> {
    Ok(Json(
        db::list_ingredients(&state.db, query.name.as_deref()).await?,
    ))
}

async fn get_ingredient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Ingredient>> {
    Ok(Json(db::get_ingredient(&state.db, id).await?))
}
