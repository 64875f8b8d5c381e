//! User API endpoints.
//!
//! Registration and profiles are public; the current-user, password and
//! subscription routes need a token.
//!
//! Routes:
//! - GET /api/users/ - Paginated user list
//! - POST /api/users/ - Register
//! - GET /api/users/me/ - Current user
//! - POST /api/users/set_password/ - Change password
//! - GET /api/users/subscriptions/ - Followed authors with recent recipes
//! - GET /api/users/:id/ - User profile
//! - POST /api/users/:id/subscribe/ - Follow an author
//! - DELETE /api/users/:id/subscribe/ - Unfollow an author

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    middleware::from_fn,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::pagination::{Page, PageQuery, Pagination};
use super::render::{self, SubscriptionResponse, UserResponse};
use super::{ApiJson, ApiPath, ApiQuery};
use crate::db::{self, CreateUser, UserRole};
use crate::error::FieldErrors;
use crate::middleware::{require_auth, AuthUser, Viewer};
use crate::services::{hash_password, verify_password};
use crate::validation::{self, MAX_NAME_LENGTH};
use crate::{AppState, Error, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/", get(list_users).post(register))
        .route("/api/users/me/", get(me).layer(from_fn(require_auth)))
        .route(
            "/api/users/set_password/",
            post(set_password).layer(from_fn(require_auth)),
        )
        .route(
            "/api/users/subscriptions/",
            get(list_subscriptions).layer(from_fn(require_auth)),
        )
        .route("/api/users/:id/", get(get_user))
        .route(
            "/api/users/:id/subscribe/",
            post(subscribe)
                .delete(unsubscribe)
                .layer(from_fn(require_auth)),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

/// Registration response; a new user cannot be subscribed to yet.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimitQuery {
    pub recipes_limit: Option<String>,
}

impl RecipesLimitQuery {
    /// Requested recipes per author, defaulting to the configured limit.
    fn resolve(&self, default: u32) -> Result<i64> {
        match self.recipes_limit.as_deref().map(str::trim) {
            None | Some("") => Ok(i64::from(default)),
            Some(raw) => raw.parse::<u32>().map(i64::from).map_err(|_| {
                FieldErrors::single("recipes_limit", "A valid non-negative integer is required.")
                    .into()
            }),
        }
    }
}

/// Validated registration input.
fn validate_registration(request: &RegisterRequest) -> Result<(CreateUser, String)> {
    let mut errors = FieldErrors::new();

    let email = validation::email(&mut errors, request.email.as_deref());
    let username = validation::username(&mut errors, request.username.as_deref());
    let first_name = validation::required_text(
        &mut errors,
        "first_name",
        request.first_name.as_deref(),
        MAX_NAME_LENGTH,
    )
    .map(str::to_string);
    let last_name = validation::required_text(
        &mut errors,
        "last_name",
        request.last_name.as_deref(),
        MAX_NAME_LENGTH,
    )
    .map(str::to_string);
    let password = validation::password(&mut errors, "password", request.password.as_deref());

    match (email, username, first_name, last_name, password) {
        (Some(email), Some(username), Some(first_name), Some(last_name), Some(password))
            if errors.is_empty() =>
        {
            Ok((
                CreateUser {
                    email,
                    username,
                    first_name,
                    last_name,
                    password_hash: String::new(),
                    role: UserRole::User,
                },
                password,
            ))
        }
        _ => Err(Error::Validation(errors)),
    }
}

/// Create a user after validating every field; shared with `createsuperuser`.
pub async fn create_account(
    state: &AppState,
    request: &RegisterRequest,
    role: UserRole,
) -> Result<db::User> {
    let (mut input, password) = validate_registration(request)?;
    input.password_hash = hash_password(&password)?;
    input.role = role;

    let user = db::create_user(&state.db, input).await?;
    info!(user_id = user.id, role = role.as_str(), "User registered");
    Ok(user)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/users/
async fn list_users(
    State(state): State<AppState>,
    viewer: Viewer,
    ApiQuery(query): ApiQuery<PageQuery>,
    uri: Uri,
) -> Result<Json<Page<UserResponse>>> {
    let pagination = Pagination::from_query(&query, &state.config.pagination)?;
    let count = db::count_users(&state.db).await?;
    pagination.ensure_in_range(count)?;

    let users = db::list_users(&state.db, pagination.limit(), pagination.offset()).await?;
    let results = render::users(&state, viewer.user_id(), users).await?;

    Ok(Json(pagination.page(
        results,
        count,
        &uri,
        &state.config.server.public_url,
    )))
}

/// POST /api/users/
async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>)> {
    let user = create_account(&state, &request, UserRole::User).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
    ))
}

/// GET /api/users/me/
async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let user = db::get_user(&state.db, auth.user_id).await?;
    Ok(Json(render::user(&state, Some(auth.user_id), user).await?))
}

/// POST /api/users/set_password/
async fn set_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(request): ApiJson<SetPasswordRequest>,
) -> Result<StatusCode> {
    let user = db::get_user(&state.db, auth.user_id).await?;

    let mut errors = FieldErrors::new();
    match request.current_password.as_deref() {
        None => errors.add("current_password", "This field is required."),
        Some(current) if !verify_password(current, &user.password_hash) => {
            errors.add("current_password", "Invalid password.")
        }
        Some(_) => {}
    }
    let new_password =
        validation::password(&mut errors, "new_password", request.new_password.as_deref());
    errors.into_result()?;

    let new_password = new_password.ok_or_else(|| {
        Error::Internal("Validated password missing".to_string())
    })?;
    db::set_password_hash(&state.db, user.id, &hash_password(&new_password)?).await?;

    info!(user_id = user.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/subscriptions/
async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<PageQuery>,
    ApiQuery(limit): ApiQuery<RecipesLimitQuery>,
    uri: Uri,
) -> Result<Json<Page<SubscriptionResponse>>> {
    let recipes_limit = limit.resolve(state.config.pagination.recipes_limit)?;
    let pagination = Pagination::from_query(&query, &state.config.pagination)?;
    let count = db::count_subscriptions(&state.db, auth.user_id).await?;
    pagination.ensure_in_range(count)?;

    let authors = db::list_subscribed_authors(
        &state.db,
        auth.user_id,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    let results = render::subscriptions(&state, authors, recipes_limit).await?;

    Ok(Json(pagination.page(
        results,
        count,
        &uri,
        &state.config.server.public_url,
    )))
}

/// GET /api/users/:id/
async fn get_user(
    State(state): State<AppState>,
    viewer: Viewer,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserResponse>> {
    let user = db::get_user(&state.db, id).await?;
    Ok(Json(render::user(&state, viewer.user_id(), user).await?))
}

/// POST /api/users/:id/subscribe/
async fn subscribe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(limit): ApiQuery<RecipesLimitQuery>,
) -> Result<(StatusCode, Json<SubscriptionResponse>)> {
    let recipes_limit = limit.resolve(state.config.pagination.recipes_limit)?;
    let author = db::get_user(&state.db, id).await?;

    db::create_subscription(&state.db, auth.user_id, author.id).await?;
    info!(user_id = auth.user_id, author_id = author.id, "Subscribed");

    let entry = render::subscriptions(&state, vec![author], recipes_limit)
        .await?
        .pop()
        .ok_or_else(|| Error::Internal("Empty subscription render".to_string()))?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /api/users/:id/subscribe/
async fn unsubscribe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    let author = db::get_user(&state.db, id).await?;

    if !db::delete_subscription(&state.db, auth.user_id, author.id).await? {
        return Err(Error::Relation(
            "You are not subscribed to this author.".to_string(),
        ));
    }

    info!(user_id = auth.user_id, author_id = author.id, "Unsubscribed");
    Ok(StatusCode::NO_CONTENT)
}
