//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use axum::http::{header::AUTHORIZATION, HeaderValue};
use axum_test::TestServer;
use foodgram::config::Config;
use foodgram::db::{self, CreateIngredient, CreateTag, DbPool};
use foodgram::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;

/// 1x1 transparent PNG.
pub const PNG_1PX: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

pub fn png_data_url() -> String {
    format!("data:image/png;base64,{}", PNG_1PX)
}

/// Running application plus handles the tests poke at directly.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub db: DbPool,
    /// Keeps the media directory alive for the test.
    pub media: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let media = TempDir::new().expect("Failed to create media dir");
    let state = AppState::with_config(Config::for_tests(media.path()))
        .await
        .expect("Failed to build state");
    let server =
        TestServer::new(foodgram::router(state.clone())).expect("Failed to create test server");

    TestApp {
        server,
        db: state.db.clone(),
        state,
        media,
    }
}

pub fn token_auth(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Token {}", token)).expect("Invalid header value")
}

/// A signed-in user.
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub token: String,
}

impl TestApp {
    /// Register `name` through the API and log in.
    pub async fn user(&self, name: &str) -> TestUser {
        let email = format!("{}@example.com", name);
        let password = "kitchen-secret-42".to_string();

        let response = self
            .server
            .post("/api/users/")
            .json(&json!({
                "email": email,
                "username": name,
                "first_name": "Test",
                "last_name": "Cook",
                "password": password,
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let id = response.json::<Value>()["id"]
            .as_i64()
            .expect("Registered user has an id");

        let token = self.login(&email, &password).await;
        TestUser {
            id,
            email,
            password,
            token,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .server
            .post("/api/auth/token/login/")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["auth_token"]
            .as_str()
            .expect("Login returns a token")
            .to_string()
    }

    /// Promote a user to admin directly in the database.
    pub async fn make_admin(&self, user_id: i64) {
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await
            .expect("Failed to promote user");
    }

    /// Seed a tag and return its id. Tag colors are unique too.
    pub async fn tag(&self, name: &str, slug: &str, color: &str) -> i64 {
        db::insert_tag_if_absent(
            &self.db,
            &CreateTag {
                name: name.to_string(),
                color: color.to_string(),
                slug: slug.to_string(),
            },
        )
        .await
        .expect("Failed to insert tag");
        sqlx::query_scalar("SELECT id FROM tags WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.db)
            .await
            .expect("Tag exists")
    }

    /// Seed an ingredient and return its id.
    pub async fn ingredient(&self, name: &str, unit: &str) -> i64 {
        db::insert_ingredient_if_absent(
            &self.db,
            &CreateIngredient {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            },
        )
        .await
        .expect("Failed to insert ingredient");
        sqlx::query_scalar("SELECT id FROM ingredients WHERE name = ? AND measurement_unit = ?")
            .bind(name)
            .bind(unit)
            .fetch_one(&self.db)
            .await
            .expect("Ingredient exists")
    }

    /// Publish a recipe as `user` and return its JSON.
    pub async fn recipe(&self, user: &TestUser, body: Value) -> Value {
        let response = self
            .server
            .post("/api/recipes/")
            .add_header(AUTHORIZATION, token_auth(&user.token))
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }
}

/// A valid recipe body.
pub fn recipe_body(name: &str, tags: &[i64], ingredients: &[(i64, i64)]) -> Value {
    json!({
        "name": name,
        "text": "Mix everything and bake.",
        "cooking_time": 30,
        "image": png_data_url(),
        "tags": tags,
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect::<Vec<_>>(),
    })
}
