//! Recipe API endpoints.
//!
//! Reading is public. Writing needs a token; editing and deleting are
//! limited to the recipe's author and admins.
//!
//! Routes:
//! - GET /api/recipes/ - Paginated, filterable recipe list
//! - POST /api/recipes/ - Publish a recipe
//! - GET /api/recipes/download_shopping_cart/ - Shopping list as text
//! - GET /api/recipes/:id/ - Recipe details
//! - PATCH /api/recipes/:id/ - Update a recipe
//! - DELETE /api/recipes/:id/ - Delete a recipe
//! - POST|DELETE /api/recipes/:id/favorite/ - Favorite / unfavorite
//! - POST|DELETE /api/recipes/:id/shopping_cart/ - Add to / remove from cart

use std::collections::HashSet;

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::pagination::{Page, PageQuery, Pagination};
use super::render::{self, RecipeResponse, RecipeShort};
use super::{ApiJson, ApiPath, ApiQuery};
use crate::db::{self, Recipe, RecipeFilter, RecipeInput, RecipeList};
use crate::error::FieldErrors;
use crate::middleware::{require_auth, AuthUser, Viewer};
use crate::services::{shopping_list, DecodedImage};
use crate::validation::{self, MAX_SMALL_AMOUNT, MAX_TITLE_LENGTH};
use crate::{AppState, Error, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/recipes/",
            get(list_recipes).merge(
                axum::routing::post(create_recipe).layer(from_fn(require_auth)),
            ),
        )
        .route(
            "/api/recipes/download_shopping_cart/",
            get(download_shopping_cart).layer(from_fn(require_auth)),
        )
        .route(
            "/api/recipes/:id/",
            get(get_recipe).merge(
                axum::routing::patch(update_recipe)
                    .delete(delete_recipe)
                    .layer(from_fn(require_auth)),
            ),
        )
        .route(
            "/api/recipes/:id/favorite/",
            axum::routing::post(add_favorite)
                .delete(remove_favorite)
                .layer(from_fn(require_auth)),
        )
        .route(
            "/api/recipes/:id/shopping_cart/",
            axum::routing::post(add_to_cart)
                .delete(remove_from_cart)
                .layer(from_fn(require_auth)),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Listing query. `tags` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

impl RecipeListQuery {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page.clone(),
            limit: self.limit.clone(),
        }
    }

    /// Build the database filter for `viewer`.
    ///
    /// List flags only apply to signed-in viewers and only when truthy.
    fn filter(&self, viewer: Option<i64>) -> Result<RecipeFilter> {
        let author_id = match self.author.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                Error::from(FieldErrors::single("author", "Enter a whole number."))
            })?),
        };

        let mut tag_slugs: Vec<String> = Vec::new();
        for slug in self.tags.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            if !tag_slugs.iter().any(|s| s == slug) {
                tag_slugs.push(slug.to_string());
            }
        }

        Ok(RecipeFilter {
            author_id,
            tag_slugs,
            favorited_by: viewer.filter(|_| is_truthy(self.is_favorited.as_deref())),
            in_cart_of: viewer.filter(|_| is_truthy(self.is_in_shopping_cart.as_deref())),
        })
    }
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true")
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: i64,
    pub amount: i64,
}

/// Body of create and update requests.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<i64>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

/// Validate a recipe body against the database.
///
/// Every field is checked and all problems are reported together. The
/// image is required when `creating`; on update it is optional.
async fn validate_recipe(
    state: &AppState,
    request: &RecipeRequest,
    creating: bool,
) -> Result<(RecipeInput, Option<DecodedImage>)> {
    let mut errors = FieldErrors::new();

    let name = validation::required_text(
        &mut errors,
        "name",
        request.name.as_deref(),
        MAX_TITLE_LENGTH,
    )
    .map(str::to_string);
    let text =
        validation::required_text(&mut errors, "text", request.text.as_deref(), usize::MAX)
            .map(str::to_string);

    match request.cooking_time {
        None => errors.add("cooking_time", "This field is required."),
        Some(t) if t < 1 => errors.add(
            "cooking_time",
            "Ensure this value is greater than or equal to 1.",
        ),
        Some(t) if t > MAX_SMALL_AMOUNT => errors.add(
            "cooking_time",
            format!("Ensure this value is less than or equal to {}.", MAX_SMALL_AMOUNT),
        ),
        Some(_) => {}
    }

    let tag_ids = request.tags.clone().unwrap_or_default();
    if tag_ids.is_empty() {
        errors.add("tags", "At least one tag is required.");
    } else if has_duplicates(tag_ids.iter().copied()) {
        errors.add("tags", "Tags must be unique.");
    } else {
        let existing = db::existing_tag_ids(&state.db, &tag_ids).await?;
        for id in tag_ids.iter().filter(|id| !existing.contains(id)) {
            errors.add("tags", format!("Invalid pk \"{}\" - object does not exist.", id));
        }
    }

    let ingredients = request.ingredients.clone().unwrap_or_default();
    if ingredients.is_empty() {
        errors.add("ingredients", "At least one ingredient is required.");
    } else if has_duplicates(ingredients.iter().map(|i| i.id)) {
        errors.add("ingredients", "Ingredients must be unique.");
    } else {
        if ingredients.iter().any(|i| i.amount < 1) {
            errors.add("ingredients", "Amount must be at least 1.");
        }
        if ingredients.iter().any(|i| i.amount > MAX_SMALL_AMOUNT) {
            errors.add(
                "ingredients",
                format!("Amount must be at most {}.", MAX_SMALL_AMOUNT),
            );
        }
        let ids: Vec<i64> = ingredients.iter().map(|i| i.id).collect();
        let existing = db::existing_ingredient_ids(&state.db, &ids).await?;
        for id in ids.iter().filter(|id| !existing.contains(id)) {
            errors.add(
                "ingredients",
                format!("Invalid pk \"{}\" - object does not exist.", id),
            );
        }
    }

    let image = match request.image.as_deref().map(str::trim) {
        None | Some("") if creating => {
            errors.add("image", "This field is required.");
            None
        }
        None | Some("") => None,
        Some(data_url) => match state.media.decode(data_url) {
            Ok(image) => Some(image),
            Err(Error::Validation(fields)) => {
                errors.merge(fields);
                None
            }
            Err(other) => return Err(other),
        },
    };

    errors.into_result()?;

    match (name, text, request.cooking_time) {
        (Some(name), Some(text), Some(cooking_time)) => Ok((
            RecipeInput {
                name,
                text,
                cooking_time,
                tag_ids,
                ingredients: ingredients.into_iter().map(|i| (i.id, i.amount)).collect(),
            },
            image,
        )),
        _ => Err(Error::Internal("Recipe validation incomplete".to_string())),
    }
}

fn has_duplicates(ids: impl Iterator<Item = i64>) -> bool {
    let mut seen = HashSet::new();
    ids.into_iter().any(|id| !seen.insert(id))
}

/// Only the author or an admin may change a recipe.
fn ensure_can_edit(auth: &AuthUser, recipe: &Recipe) -> Result<()> {
    if recipe.author_id == auth.user_id || auth.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/recipes/
async fn list_recipes(
    State(state): State<AppState>,
    viewer: Viewer,
    ApiQuery(query): ApiQuery<RecipeListQuery>,
    uri: Uri,
) -> Result<Json<Page<RecipeResponse>>> {
    let pagination = Pagination::from_query(&query.page_query(), &state.config.pagination)?;
    let filter = query.filter(viewer.user_id())?;

    let count = db::count_recipes(&state.db, &filter).await?;
    pagination.ensure_in_range(count)?;

    let recipes =
        db::list_recipes(&state.db, &filter, pagination.limit(), pagination.offset()).await?;
    let results = render::recipes(&state, viewer.user_id(), recipes).await?;

    Ok(Json(pagination.page(
        results,
        count,
        &uri,
        &state.config.server.public_url,
    )))
}

/// POST /api/recipes/
async fn create_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(request): ApiJson<RecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>)> {
    let (input, image) = validate_recipe(&state, &request, true).await?;
    let image = image.ok_or_else(|| Error::Internal("Validated image missing".to_string()))?;

    let image_path = state.media.save(&image).await?;
    let recipe = match db::create_recipe(&state.db, auth.user_id, &image_path, &input).await {
        Ok(recipe) => recipe,
        Err(e) => {
            state.media.remove(&image_path).await;
            return Err(e);
        }
    };

    info!(recipe_id = recipe.id, author_id = auth.user_id, "Recipe created");
    let body = render::recipe(&state, Some(auth.user_id), recipe).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /api/recipes/:id/
async fn get_recipe(
    State(state): State<AppState>,
    viewer: Viewer,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<RecipeResponse>> {
    let recipe = db::get_recipe(&state.db, id).await?;
    Ok(Json(render::recipe(&state, viewer.user_id(), recipe).await?))
}

/// PATCH /api/recipes/:id/
async fn update_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<RecipeRequest>,
) -> Result<Json<RecipeResponse>> {
    let existing = db::get_recipe(&state.db, id).await?;
    ensure_can_edit(&auth, &existing)?;

    let (input, image) = validate_recipe(&state, &request, false).await?;

    let new_image = match &image {
        Some(image) => Some(state.media.save(image).await?),
        None => None,
    };

    let recipe = match db::update_recipe(&state.db, id, new_image.as_deref(), &input).await {
        Ok(recipe) => recipe,
        Err(e) => {
            if let Some(path) = &new_image {
                state.media.remove(path).await;
            }
            return Err(e);
        }
    };

    if new_image.is_some() {
        state.media.remove(&existing.image).await;
    }

    info!(recipe_id = id, user_id = auth.user_id, "Recipe updated");
    Ok(Json(render::recipe(&state, Some(auth.user_id), recipe).await?))
}

/// DELETE /api/recipes/:id/
async fn delete_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    let recipe = db::get_recipe(&state.db, id).await?;
    ensure_can_edit(&auth, &recipe)?;

    db::delete_recipe(&state.db, id).await?;
    state.media.remove(&recipe.image).await;

    info!(recipe_id = id, user_id = auth.user_id, "Recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Add a recipe to one of the viewer's lists.
async fn add_to_list(
    state: &AppState,
    auth: &AuthUser,
    list: RecipeList,
    id: i64,
) -> Result<(StatusCode, Json<RecipeShort>)> {
    let recipe = db::get_recipe(&state.db, id).await?;

    if !db::add_to_list(&state.db, list, auth.user_id, recipe.id).await? {
        return Err(Error::Relation(format!(
            "Recipe is already in {}.",
            list.label()
        )));
    }

    info!(recipe_id = recipe.id, user_id = auth.user_id, list = list.label(), "Recipe added");
    Ok((StatusCode::CREATED, Json(RecipeShort::new(state, &recipe))))
}

/// Remove a recipe from one of the viewer's lists.
async fn remove_from_list(
    state: &AppState,
    auth: &AuthUser,
    list: RecipeList,
    id: i64,
) -> Result<StatusCode> {
    let recipe = db::get_recipe(&state.db, id).await?;

    if !db::remove_from_list(&state.db, list, auth.user_id, recipe.id).await? {
        return Err(Error::Relation(format!("Recipe is not in {}.", list.label())));
    }

    info!(recipe_id = recipe.id, user_id = auth.user_id, list = list.label(), "Recipe removed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/:id/favorite/
async fn add_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<(StatusCode, Json<RecipeShort>)> {
    add_to_list(&state, &auth, RecipeList::Favorites, id).await
}

/// DELETE /api/recipes/:id/favorite/
async fn remove_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    remove_from_list(&state, &auth, RecipeList::Favorites, id).await
}

/// POST /api/recipes/:id/shopping_cart/
async fn add_to_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<(StatusCode, Json<RecipeShort>)> {
    add_to_list(&state, &auth, RecipeList::ShoppingCart, id).await
}

/// DELETE /api/recipes/:id/shopping_cart/
async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    remove_from_list(&state, &auth, RecipeList::ShoppingCart, id).await
}

/// GET /api/recipes/download_shopping_cart/
async fn download_shopping_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let body = shopping_list::build(&state.db, auth.user_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", shopping_list::FILENAME),
            ),
        ],
        body,
    ))
}
