//! Ingredient queries, including the per-recipe amounts.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::{Error, Result};

use super::DbPool;

/// Ingredient record; serialized as-is in API responses.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// Ingredient with the amount a recipe needs.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Input for creating an ingredient.
#[derive(Debug, Clone)]
pub struct CreateIngredient {
    pub name: String,
    pub measurement_unit: String,
}

/// Ingredients ordered by id, optionally limited to names starting with `prefix`.
///
/// The prefix match is case-sensitive.
pub async fn list_ingredients(pool: &DbPool, prefix: Option<&str>) -> Result<Vec<Ingredient>> {
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => sqlx::query_as::<_, Ingredient>(
            "SELECT * FROM ingredients WHERE substr(name, 1, length(?1)) = ?1 ORDER BY id",
        )
        .bind(prefix)
        .fetch_all(pool)
        .await
        .map_err(Error::Database),
        None => sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(Error::Database),
    }
}

/// Get an ingredient by ID.
pub async fn get_ingredient(pool: &DbPool, id: i64) -> Result<Ingredient> {
    sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Ingredient"))
}

/// Which of `ids` refer to existing ingredients.
pub async fn existing_ingredient_ids(pool: &DbPool, ids: &[i64]) -> Result<Vec<i64>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id FROM ingredients WHERE id IN (");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(")");

    let rows: Vec<(i64,)> = qb.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Ingredients of each recipe, in the order they were added.
pub async fn ingredients_for_recipes(
    pool: &DbPool,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<RecipeIngredient>>> {
    let mut by_recipe: HashMap<i64, Vec<RecipeIngredient>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(by_recipe);
    }

    #[derive(FromRow)]
    struct Row {
        recipe_id: i64,
        id: i64,
        name: String,
        measurement_unit: String,
        amount: i64,
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount \
         FROM recipe_ingredients ri INNER JOIN ingredients i ON i.id = ri.ingredient_id \
         WHERE ri.recipe_id IN (",
    );
    let mut sep = qb.separated(", ");
    for id in recipe_ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(") ORDER BY ri.id");

    let rows: Vec<Row> = qb.build_query_as().fetch_all(pool).await?;
    for row in rows {
        by_recipe.entry(row.recipe_id).or_default().push(RecipeIngredient {
            id: row.id,
            name: row.name,
            measurement_unit: row.measurement_unit,
            amount: row.amount,
        });
    }

    Ok(by_recipe)
}

/// Insert an ingredient unless the (name, unit) pair exists.
///
/// Returns true when a row was inserted.
pub async fn insert_ingredient_if_absent(pool: &DbPool, input: &CreateIngredient) -> Result<bool> {
    let result =
        sqlx::query("INSERT OR IGNORE INTO ingredients (name, measurement_unit) VALUES (?, ?)")
            .bind(&input.name)
            .bind(&input.measurement_unit)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
pub(crate) fn sample_ingredient(name: &str, unit: &str) -> CreateIngredient {
    CreateIngredient {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
    }
}
