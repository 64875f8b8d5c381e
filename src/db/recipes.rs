//! Recipe queries.
//!
//! A recipe row plus its tag links and ingredient amounts are always
//! written together inside one transaction.

use std::collections::HashMap;

use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{Error, Result};

use super::DbPool;

/// Recipe record from the database.
#[derive(Debug, Clone, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    /// Media-relative image path, e.g. `recipes/<uuid>.png`.
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
    pub pub_date: String,
}

/// Input for creating or replacing a recipe.
#[derive(Debug, Clone)]
pub struct RecipeInput {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub tag_ids: Vec<i64>,
    /// (ingredient id, amount) pairs; ids are unique.
    pub ingredients: Vec<(i64, i64)>,
}

/// Filters for the recipe listing.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author_id: Option<i64>,
    /// Match recipes having any of these tag slugs.
    pub tag_slugs: Vec<String>,
    /// Only recipes favorited by this user.
    pub favorited_by: Option<i64>,
    /// Only recipes in this user's shopping cart.
    pub in_cart_of: Option<i64>,
}

impl RecipeFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");

        if let Some(author_id) = self.author_id {
            qb.push(" AND r.author_id = ").push_bind(author_id);
        }

        if !self.tag_slugs.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug IN (",
            );
            let mut sep = qb.separated(", ");
            for slug in &self.tag_slugs {
                sep.push_bind(slug.clone());
            }
            sep.push_unseparated("))");
        }

        if let Some(user_id) = self.favorited_by {
            qb.push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }

        if let Some(user_id) = self.in_cart_of {
            qb.push(
                " AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
            )
            .push_bind(user_id)
            .push(")");
        }
    }
}

/// Page of recipes matching the filter, newest first.
pub async fn list_recipes(
    pool: &DbPool,
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Recipe>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT r.* FROM recipes r");
    filter.push_where(&mut qb);
    qb.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    qb.build_query_as::<Recipe>()
        .fetch_all(pool)
        .await
        .map_err(Error::Database)
}

/// Number of recipes matching the filter.
pub async fn count_recipes(pool: &DbPool, filter: &RecipeFilter) -> Result<i64> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    filter.push_where(&mut qb);

    let (count,): (i64,) = qb.build_query_as().fetch_one(pool).await?;
    Ok(count)
}

/// Get a recipe by ID.
pub async fn get_recipe(pool: &DbPool, id: i64) -> Result<Recipe> {
    sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Recipe"))
}

/// Create a recipe with its tags and ingredients.
pub async fn create_recipe(
    pool: &DbPool,
    author_id: i64,
    image: &str,
    input: &RecipeInput,
) -> Result<Recipe> {
    let mut tx = pool.begin().await?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(author_id)
    .bind(&input.name)
    .bind(image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .fetch_one(&mut *tx)
    .await?;

    write_relations(&mut tx, recipe.id, input).await?;
    tx.commit().await?;

    Ok(recipe)
}

/// Replace a recipe's fields, tags and ingredients.
///
/// `image` is only changed when provided.
pub async fn update_recipe(
    pool: &DbPool,
    id: i64,
    image: Option<&str>,
    input: &RecipeInput,
) -> Result<Recipe> {
    let mut tx = pool.begin().await?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
        SET name = ?, text = ?, cooking_time = ?, image = COALESCE(?, image)
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(image)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::not_found("Recipe"))?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    write_relations(&mut tx, id, input).await?;
    tx.commit().await?;

    Ok(recipe)
}

async fn write_relations(conn: &mut SqliteConnection, recipe_id: i64, input: &RecipeInput) -> Result<()> {
    if !input.tag_ids.is_empty() {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        qb.push_values(&input.tag_ids, |mut row, tag_id| {
            row.push_bind(recipe_id).push_bind(*tag_id);
        });
        qb.build().execute(&mut *conn).await?;
    }

    if !input.ingredients.is_empty() {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );
        qb.push_values(&input.ingredients, |mut row, (ingredient_id, amount)| {
            row.push_bind(recipe_id)
                .push_bind(*ingredient_id)
                .push_bind(*amount);
        });
        qb.build().execute(&mut *conn).await?;
    }

    Ok(())
}

/// Delete a recipe; relations cascade.
pub async fn delete_recipe(pool: &DbPool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Recipe"));
    }

    Ok(())
}

/// The newest `limit` recipes of each author.
pub async fn recent_recipes_by_authors(
    pool: &DbPool,
    author_ids: &[i64],
    limit: i64,
) -> Result<HashMap<i64, Vec<Recipe>>> {
    let mut by_author: HashMap<i64, Vec<Recipe>> = HashMap::new();
    if author_ids.is_empty() || limit <= 0 {
        return Ok(by_author);
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, author_id, name, image, text, cooking_time, pub_date FROM ( \
         SELECT r.*, ROW_NUMBER() OVER ( \
         PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS rn \
         FROM recipes r WHERE r.author_id IN (",
    );
    let mut sep = qb.separated(", ");
    for id in author_ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(")) WHERE rn <= ");
    qb.push_bind(limit);
    qb.push(" ORDER BY author_id, rn");

    let rows: Vec<Recipe> = qb.build_query_as().fetch_all(pool).await?;
    for recipe in rows {
        by_author.entry(recipe.author_id).or_default().push(recipe);
    }

    Ok(by_author)
}

/// Number of recipes per author.
pub async fn count_recipes_by_authors(
    pool: &DbPool,
    author_ids: &[i64],
) -> Result<HashMap<i64, i64>> {
    if author_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT author_id, COUNT(*) FROM recipes WHERE author_id IN (");
    let mut sep = qb.separated(", ");
    for id in author_ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(") GROUP BY author_id");

    let rows: Vec<(i64, i64)> = qb.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().collect())
}

#[cfg(test)]
pub(crate) async fn seed_recipe(
    pool: &DbPool,
    author_id: i64,
    name: &str,
    tag_ids: Vec<i64>,
    ingredients: Vec<(i64, i64)>,
) -> Recipe {
    create_recipe(
        pool,
        author_id,
        "recipes/test.png",
        &RecipeInput {
            name: name.to_string(),
            text: format!("How to make {}", name),
            cooking_time: 10,
            tag_ids,
            ingredients,
        },
    )
    .await
    .unwrap()
}
