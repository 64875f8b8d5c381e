//! Response representations shared by the user and recipe endpoints.
//!
//! List endpoints render whole pages at once, so related rows (tags,
//! ingredients, authors, the viewer's lists and follows) are loaded in
//! batches keyed by id rather than per object.

use std::collections::HashSet;

use serde::Serialize;

use crate::db::{self, Recipe, RecipeIngredient, RecipeList, Tag, User};
use crate::{AppState, Error, Result};

/// Public user profile.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

/// Recipe summary embedded in lists and returned by favorite / cart actions.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeShort {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

impl RecipeShort {
    pub fn new(state: &AppState, recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: state.media.url_for(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Full recipe representation.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

/// A followed author with their newest recipes.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub author: UserResponse,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

/// Render users with `is_subscribed` relative to the viewer.
pub async fn users(state: &AppState, viewer: Option<i64>, users: Vec<User>) -> Result<Vec<UserResponse>> {
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    let followed = match viewer {
        Some(viewer_id) => db::subscribed_author_ids(&state.db, viewer_id, &ids).await?,
        None => HashSet::new(),
    };

    Ok(users
        .into_iter()
        .map(|u| {
            let subscribed = followed.contains(&u.id);
            UserResponse::new(u, subscribed)
        })
        .collect())
}

pub async fn user(state: &AppState, viewer: Option<i64>, user: User) -> Result<UserResponse> {
    single(users(state, viewer, vec![user]).await?)
}

/// Render full recipes for the viewer.
pub async fn recipes(
    state: &AppState,
    viewer: Option<i64>,
    recipes: Vec<Recipe>,
) -> Result<Vec<RecipeResponse>> {
    let recipe_ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<i64> = recipes.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut tags = db::tags_for_recipes(&state.db, &recipe_ids).await?;
    let mut ingredients = db::ingredients_for_recipes(&state.db, &recipe_ids).await?;
    let authors = db::users_by_ids(&state.db, &author_ids).await?;

    let (favorites, cart, followed) = match viewer {
        Some(viewer_id) => (
            db::recipes_in_list(&state.db, RecipeList::Favorites, viewer_id, &recipe_ids).await?,
            db::recipes_in_list(&state.db, RecipeList::ShoppingCart, viewer_id, &recipe_ids)
                .await?,
            db::subscribed_author_ids(&state.db, viewer_id, &author_ids).await?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("Recipe {} has no author", recipe.id)))?;

            Ok(RecipeResponse {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author: UserResponse::new(author, followed.contains(&recipe.author_id)),
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorites.contains(&recipe.id),
                is_in_shopping_cart: cart.contains(&recipe.id),
                image: state.media.url_for(&recipe.image),
                name: recipe.name,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

pub async fn recipe(state: &AppState, viewer: Option<i64>, recipe: Recipe) -> Result<RecipeResponse> {
    single(recipes(state, viewer, vec![recipe]).await?)
}

/// Render followed authors with at most `recipes_limit` recipes each.
pub async fn subscriptions(
    state: &AppState,
    authors: Vec<User>,
    recipes_limit: i64,
) -> Result<Vec<SubscriptionResponse>> {
    let ids: Vec<i64> = authors.iter().map(|a| a.id).collect();
    let mut recent = db::recent_recipes_by_authors(&state.db, &ids, recipes_limit).await?;
    let counts = db::count_recipes_by_authors(&state.db, &ids).await?;

    Ok(authors
        .into_iter()
        .map(|author| {
            let recipes = recent
                .remove(&author.id)
                .unwrap_or_default()
                .iter()
                .map(|r| RecipeShort::new(state, r))
                .collect();
            let recipes_count = counts.get(&author.id).copied().unwrap_or(0);

            SubscriptionResponse {
                author: UserResponse::new(author, true),
                recipes,
                recipes_count,
            }
        })
        .collect())
}

fn single<T>(mut items: Vec<T>) -> Result<T> {
    items
        .pop()
        .ok_or_else(|| Error::Internal("Empty render result".to_string()))
}
