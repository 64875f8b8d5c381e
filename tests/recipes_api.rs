//! Recipe, favorite and shopping cart endpoint tests.

mod common;

use axum::http::{header, header::AUTHORIZATION, StatusCode};
use common::{png_data_url, recipe_body, spawn_app, token_auth, TestApp, TestUser};
use serde_json::{json, Value};

/// Two tags and two ingredients seeded for recipe tests.
struct Pantry {
    breakfast: i64,
    dinner: i64,
    flour: i64,
    milk: i64,
}

async fn pantry(app: &TestApp) -> Pantry {
    Pantry {
        breakfast: app.tag("Breakfast", "breakfast", "#E26C2D").await,
        dinner: app.tag("Dinner", "dinner", "#49B64E").await,
        flour: app.ingredient("flour", "g").await,
        milk: app.ingredient("milk", "ml").await,
    }
}

async fn post_as(app: &TestApp, user: &TestUser, path: &str) -> axum_test::TestResponse {
    app.server
        .post(path)
        .add_header(AUTHORIZATION, token_auth(&user.token))
        .await
}

// ============================================================================
// Reference data
// ============================================================================

#[tokio::test]
async fn test_tags_and_ingredients_are_public() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    app.ingredient("flax seeds", "g").await;

    let tags: Value = app.server.get("/api/tags/").await.json();
    assert_eq!(tags.as_array().unwrap().len(), 2);
    assert_eq!(tags[0]["slug"], "breakfast");
    assert_eq!(tags[0]["color"], "#E26C2D");

    let tag: Value = app.server.get(&format!("/api/tags/{}/", p.dinner)).await.json();
    assert_eq!(tag["name"], "Dinner");

    let matches: Value = app.server.get("/api/ingredients/?name=fl").await.json();
    let names: Vec<&str> = matches
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["flour", "flax seeds"]);

    let milk: Value = app
        .server
        .get(&format!("/api/ingredients/{}/", p.milk))
        .await
        .json();
    assert_eq!(milk["measurement_unit"], "ml");

    app.server.get("/api/tags/999/").await.assert_status_not_found();
}

// ============================================================================
// Create / read
// ============================================================================

#[tokio::test]
async fn test_create_recipe() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;

    let recipe = app
        .recipe(
            &author,
            recipe_body("Pancakes", &[p.breakfast], &[(p.flour, 200), (p.milk, 300)]),
        )
        .await;

    assert_eq!(recipe["name"], "Pancakes");
    assert_eq!(recipe["cooking_time"], 30);
    assert_eq!(recipe["author"]["id"], author.id);
    assert_eq!(recipe["tags"][0]["slug"], "breakfast");
    assert_eq!(recipe["ingredients"].as_array().unwrap().len(), 2);
    assert_eq!(recipe["is_favorited"], false);
    assert_eq!(recipe["is_in_shopping_cart"], false);

    let image = recipe["image"].as_str().unwrap();
    assert!(image.starts_with("http://testserver/media/recipes/"));
    assert!(image.ends_with(".png"));

    // The stored image is served back
    let path = image.trim_start_matches("http://testserver");
    app.server.get(path).await.assert_status_ok();
}

#[tokio::test]
async fn test_create_recipe_requires_token() {
    let app = spawn_app().await;
    let p = pantry(&app).await;

    app.server
        .post("/api/recipes/")
        .json(&recipe_body("Pancakes", &[p.breakfast], &[(p.flour, 200)]))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_create_recipe_reports_all_errors() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;

    let response = app
        .server
        .post("/api/recipes/")
        .add_header(AUTHORIZATION, token_auth(&author.token))
        .json(&json!({
            "name": "",
            "text": "Stir.",
            "cooking_time": 0,
            "image": "data:text/plain;base64,aGVsbG8=",
            "tags": [p.breakfast, p.breakfast],
            "ingredients": [
                { "id": p.flour, "amount": 0 },
                { "id": 999, "amount": 1 },
            ],
        }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    for field in ["name", "cooking_time", "image", "tags", "ingredients"] {
        assert!(body[field].is_array(), "missing error for {}", field);
    }
    assert_eq!(body["tags"][0], "Tags must be unique.");
}

#[tokio::test]
async fn test_amounts_and_cooking_time_are_capped() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;

    let mut body = recipe_body("Vat of dough", &[p.breakfast], &[(p.flour, i64::MAX)]);
    body["cooking_time"] = json!(32_768);
    let response = app
        .server
        .post("/api/recipes/")
        .add_header(AUTHORIZATION, token_auth(&author.token))
        .json(&body)
        .await;

    response.assert_status_bad_request();
    let errors: Value = response.json();
    assert_eq!(errors["ingredients"][0], "Amount must be at most 32767.");
    assert_eq!(
        errors["cooking_time"][0],
        "Ensure this value is less than or equal to 32767."
    );

    // The largest accepted amounts still sum cleanly in the cart
    for name in ["Big batch", "Bigger batch"] {
        let recipe = app
            .recipe(&author, recipe_body(name, &[p.breakfast], &[(p.flour, 32_767)]))
            .await;
        post_as(
            &app,
            &author,
            &format!("/api/recipes/{}/shopping_cart/", recipe["id"]),
        )
        .await
        .assert_status(StatusCode::CREATED);
    }

    let download = app
        .server
        .get("/api/recipes/download_shopping_cart/")
        .add_header(AUTHORIZATION, token_auth(&author.token))
        .await;
    download.assert_status_ok();
    assert_eq!(
        download.text(),
        "Foodgram shopping list:\n\n1) flour (g) - 65534\n"
    );
}

#[tokio::test]
async fn test_get_recipe_for_anonymous_and_missing() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;
    let recipe = app
        .recipe(&author, recipe_body("Soup", &[p.dinner], &[(p.milk, 100)]))
        .await;

    let response = app
        .server
        .get(&format!("/api/recipes/{}/", recipe["id"]))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Soup");
    assert_eq!(body["author"]["is_subscribed"], false);

    app.server.get("/api/recipes/999/").await.assert_status_not_found();
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_filters() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let ana = app.user("ana").await;
    let ben = app.user("ben").await;

    let pancakes = app
        .recipe(&ana, recipe_body("Pancakes", &[p.breakfast], &[(p.flour, 1)]))
        .await;
    app.recipe(&ana, recipe_body("Stew", &[p.dinner], &[(p.flour, 1)]))
        .await;
    app.recipe(
        &ben,
        recipe_body("Porridge", &[p.breakfast, p.dinner], &[(p.milk, 1)]),
    )
    .await;

    let all: Value = app.server.get("/api/recipes/").await.json();
    assert_eq!(all["count"], 3);
    // Newest first
    assert_eq!(all["results"][0]["name"], "Porridge");

    let by_author: Value = app
        .server
        .get(&format!("/api/recipes/?author={}", ana.id))
        .await
        .json();
    assert_eq!(by_author["count"], 2);

    let breakfast: Value = app.server.get("/api/recipes/?tags=breakfast").await.json();
    assert_eq!(breakfast["count"], 2);

    let either: Value = app
        .server
        .get("/api/recipes/?tags=breakfast&tags=dinner")
        .await
        .json();
    assert_eq!(either["count"], 3);

    post_as(
        &app,
        &ben,
        &format!("/api/recipes/{}/favorite/", pancakes["id"]),
    )
    .await
    .assert_status(StatusCode::CREATED);

    let favorited: Value = app
        .server
        .get("/api/recipes/?is_favorited=1")
        .add_header(AUTHORIZATION, token_auth(&ben.token))
        .await
        .json();
    assert_eq!(favorited["count"], 1);
    assert_eq!(favorited["results"][0]["is_favorited"], true);

    // Anonymous viewers have no favorites, so the flag is ignored
    let anonymous: Value = app.server.get("/api/recipes/?is_favorited=1").await.json();
    assert_eq!(anonymous["count"], 3);
}

#[tokio::test]
async fn test_list_pagination_links() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;
    for n in 0..5 {
        app.recipe(
            &author,
            recipe_body(&format!("Bread {}", n), &[p.breakfast], &[(p.flour, 100)]),
        )
        .await;
    }

    let first: Value = app.server.get("/api/recipes/?limit=2").await.json();
    assert_eq!(first["count"], 5);
    assert_eq!(first["results"].as_array().unwrap().len(), 2);
    assert_eq!(first["next"], "http://testserver/api/recipes/?limit=2&page=2");

    let last: Value = app.server.get("/api/recipes/?limit=2&page=3").await.json();
    assert_eq!(last["results"].as_array().unwrap().len(), 1);
    assert!(last["next"].is_null());
    assert_eq!(
        last["previous"],
        "http://testserver/api/recipes/?limit=2&page=2"
    );

    app.server
        .get("/api/recipes/?limit=2&page=4")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_malformed_list_query_uses_error_body() {
    let app = spawn_app().await;

    let response = app.server.get("/api/recipes/?page=1&page=2").await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["detail"].is_string());
}

// ============================================================================
// Update / delete
// ============================================================================

#[tokio::test]
async fn test_update_recipe_by_author() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;
    let recipe = app
        .recipe(&author, recipe_body("Soup", &[p.dinner], &[(p.milk, 100)]))
        .await;

    let response = app
        .server
        .patch(&format!("/api/recipes/{}/", recipe["id"]))
        .add_header(AUTHORIZATION, token_auth(&author.token))
        .json(&json!({
            "name": "Cream soup",
            "text": "Simmer slowly.",
            "cooking_time": 45,
            "tags": [p.dinner, p.breakfast],
            "ingredients": [{ "id": p.flour, "amount": 20 }],
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Cream soup");
    assert_eq!(body["cooking_time"], 45);
    assert_eq!(body["tags"].as_array().unwrap().len(), 2);
    assert_eq!(body["ingredients"][0]["name"], "flour");
    assert_eq!(body["ingredients"][0]["amount"], 20);
    // Image untouched when omitted
    assert_eq!(body["image"], recipe["image"]);
}

#[tokio::test]
async fn test_update_replaces_image() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;
    let recipe = app
        .recipe(&author, recipe_body("Soup", &[p.dinner], &[(p.milk, 100)]))
        .await;

    let mut body = recipe_body("Soup", &[p.dinner], &[(p.milk, 100)]);
    body["image"] = json!(png_data_url());
    let updated: Value = app
        .server
        .patch(&format!("/api/recipes/{}/", recipe["id"]))
        .add_header(AUTHORIZATION, token_auth(&author.token))
        .json(&body)
        .await
        .json();

    assert_ne!(updated["image"], recipe["image"]);
    let old_path = recipe["image"]
        .as_str()
        .unwrap()
        .trim_start_matches("http://testserver/media/");
    assert!(!app.media.path().join(old_path).exists());
}

#[tokio::test]
async fn test_only_author_or_admin_can_modify() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;
    let stranger = app.user("stranger").await;
    let admin = app.user("boss").await;
    app.make_admin(admin.id).await;

    let recipe = app
        .recipe(&author, recipe_body("Soup", &[p.dinner], &[(p.milk, 100)]))
        .await;
    let path = format!("/api/recipes/{}/", recipe["id"]);

    // Forbidden is reported before the body is validated
    app.server
        .patch(&path)
        .add_header(AUTHORIZATION, token_auth(&stranger.token))
        .json(&json!({}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .delete(&path)
        .add_header(AUTHORIZATION, token_auth(&stranger.token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .delete(&path)
        .add_header(AUTHORIZATION, token_auth(&admin.token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server.get(&path).await.assert_status_not_found();
}

#[tokio::test]
async fn test_delete_removes_image() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;
    let recipe = app
        .recipe(&author, recipe_body("Soup", &[p.dinner], &[(p.milk, 100)]))
        .await;
    let stored = recipe["image"]
        .as_str()
        .unwrap()
        .trim_start_matches("http://testserver/media/")
        .to_string();
    assert!(app.media.path().join(&stored).exists());

    app.server
        .delete(&format!("/api/recipes/{}/", recipe["id"]))
        .add_header(AUTHORIZATION, token_auth(&author.token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(!app.media.path().join(&stored).exists());
}

// ============================================================================
// Favorites and shopping cart
// ============================================================================

#[tokio::test]
async fn test_favorite_twice_and_remove() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;
    let fan = app.user("fan").await;
    let recipe = app
        .recipe(&author, recipe_body("Soup", &[p.dinner], &[(p.milk, 100)]))
        .await;
    let path = format!("/api/recipes/{}/favorite/", recipe["id"]);

    let added = post_as(&app, &fan, &path).await;
    added.assert_status(StatusCode::CREATED);
    let short: Value = added.json();
    assert_eq!(short["id"], recipe["id"]);
    assert_eq!(short["name"], "Soup");
    assert!(short.get("text").is_none());

    let twice = post_as(&app, &fan, &path).await;
    twice.assert_status_bad_request();
    assert_eq!(twice.json::<Value>()["errors"], "Recipe is already in favorites.");

    app.server
        .delete(&path)
        .add_header(AUTHORIZATION, token_auth(&fan.token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let gone = app
        .server
        .delete(&path)
        .add_header(AUTHORIZATION, token_auth(&fan.token))
        .await;
    gone.assert_status_bad_request();
    assert_eq!(gone.json::<Value>()["errors"], "Recipe is not in favorites.");

    post_as(&app, &fan, "/api/recipes/999/favorite/")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_shopping_cart_download_aggregates_amounts() {
    let app = spawn_app().await;
    let p = pantry(&app).await;
    let author = app.user("author").await;
    let cook = app.user("cook").await;

    let pancakes = app
        .recipe(
            &author,
            recipe_body("Pancakes", &[p.breakfast], &[(p.flour, 200), (p.milk, 300)]),
        )
        .await;
    let bread = app
        .recipe(&author, recipe_body("Bread", &[p.dinner], &[(p.flour, 500)]))
        .await;

    for recipe in [&pancakes, &bread] {
        post_as(
            &app,
            &cook,
            &format!("/api/recipes/{}/shopping_cart/", recipe["id"]),
        )
        .await
        .assert_status(StatusCode::CREATED);
    }

    let listed: Value = app
        .server
        .get("/api/recipes/?is_in_shopping_cart=1")
        .add_header(AUTHORIZATION, token_auth(&cook.token))
        .await
        .json();
    assert_eq!(listed["count"], 2);

    let response = app
        .server
        .get("/api/recipes/download_shopping_cart/")
        .add_header(AUTHORIZATION, token_auth(&cook.token))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=shopping-list.txt"
    );
    assert_eq!(
        response.text(),
        "Foodgram shopping list:\n\n1) flour (g) - 700\n2) milk (ml) - 300\n"
    );
}

#[tokio::test]
async fn test_empty_shopping_cart_download() {
    let app = spawn_app().await;
    let cook = app.user("cook").await;

    let response = app
        .server
        .get("/api/recipes/download_shopping_cart/")
        .add_header(AUTHORIZATION, token_auth(&cook.token))
        .await;

    response.assert_status_ok();
    assert_eq!(response.text(), "Foodgram shopping list:\n");
}

#[tokio::test]
async fn test_download_requires_token() {
    let app = spawn_app().await;

    app.server
        .get("/api/recipes/download_shopping_cart/")
        .await
        .assert_status_unauthorized();
}
