//! Per-user recipe lists: favorites and the shopping cart.
//!
//! Both lists share one shape (a unique user/recipe pair), so the queries
//! are written once and parameterized by [`RecipeList`].

use std::collections::HashSet;

use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::{Error, Result};

use super::DbPool;

/// Which per-user list a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(&self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::ShoppingCart => "shopping_cart",
        }
    }

    /// Human-readable name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::ShoppingCart => "shopping cart",
        }
    }
}

/// Add a recipe to a user's list. Returns false if it was already there.
pub async fn add_to_list(pool: &DbPool, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<bool> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} (user_id, recipe_id) VALUES (?, ?)",
        list.table()
    );
    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove a recipe from a user's list. Returns false if it was not there.
pub async fn remove_from_list(
    pool: &DbPool,
    list: RecipeList,
    user_id: i64,
    recipe_id: i64,
) -> Result<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
        list.table()
    );
    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Which of `recipe_ids` are on the user's list.
pub async fn recipes_in_list(
    pool: &DbPool,
    list: RecipeList,
    user_id: i64,
    recipe_ids: &[i64],
) -> Result<HashSet<i64>> {
    if recipe_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT recipe_id FROM {} WHERE user_id = ",
        list.table()
    ));
    qb.push_bind(user_id);
    qb.push(" AND recipe_id IN (");
    let mut sep = qb.separated(", ");
    for id in recipe_ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(")");

    let rows: Vec<(i64,)> = qb.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Summed amount of one ingredient across a shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct IngredientTotal {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Aggregate the ingredients of every recipe in the user's cart.
///
/// Amounts are grouped by ingredient name and measurement unit and
/// returned ordered by name, then unit.
pub async fn shopping_cart_totals(pool: &DbPool, user_id: i64) -> Result<Vec<IngredientTotal>> {
    sqlx::query_as::<_, IngredientTotal>(
        r#"
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(ri.amount) AS total
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = ?
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(Error::Database)
}
