//! Tag queries.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::{Error, Result};

use super::DbPool;

/// Tag record; serialized as-is in API responses.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Input for creating a tag.
#[derive(Debug, Clone)]
pub struct CreateTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// All tags ordered by id.
pub async fn list_tags(pool: &DbPool) -> Result<Vec<Tag>> {
    sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(Error::Database)
}

/// Get a tag by ID.
pub async fn get_tag(pool: &DbPool, id: i64) -> Result<Tag> {
    sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("Tag"))
}

/// Which of `ids` refer to existing tags.
pub async fn existing_tag_ids(pool: &DbPool, ids: &[i64]) -> Result<Vec<i64>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM tags WHERE id IN (");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(")");

    let rows: Vec<(i64,)> = qb.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Tags of each recipe, ordered by tag id.
pub async fn tags_for_recipes(pool: &DbPool, recipe_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
    let mut by_recipe: HashMap<i64, Vec<Tag>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(by_recipe);
    }

    #[derive(FromRow)]
    struct Row {
        recipe_id: i64,
        id: i64,
        name: String,
        color: String,
        slug: String,
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT rt.recipe_id, t.id, t.name, t.color, t.slug \
         FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
         WHERE rt.recipe_id IN (",
    );
    let mut sep = qb.separated(", ");
    for id in recipe_ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(") ORDER BY t.id");

    let rows: Vec<Row> = qb.build_query_as().fetch_all(pool).await?;
    for row in rows {
        by_recipe.entry(row.recipe_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
            color: row.color,
            slug: row.slug,
        });
    }

    Ok(by_recipe)
}

/// Insert a tag unless one with the same name, color or slug exists.
///
/// Returns true when a row was inserted.
pub async fn insert_tag_if_absent(pool: &DbPool, input: &CreateTag) -> Result<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO tags (name, color, slug) VALUES (?, ?, ?)")
        .bind(&input.name)
        .bind(&input.color)
        .bind(&input.slug)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// An existing tag sharing `input`'s name or color under another slug.
///
/// `None` when the slug itself exists, since such rows are skipped.
pub async fn find_tag_conflict(pool: &DbPool, input: &CreateTag) -> Result<Option<Tag>> {
    sqlx::query_as::<_, Tag>(
        "SELECT * FROM tags WHERE (name = ? OR color = ?) \
         AND NOT EXISTS (SELECT 1 FROM tags WHERE slug = ?) \
         ORDER BY id LIMIT 1",
    )
    .bind(&input.name)
    .bind(&input.color)
    .bind(&input.slug)
    .fetch_optional(pool)
    .await
    .map_err(Error::Database)
}

#[cfg(test)]
pub(crate) fn sample_tag(slug: &str, color: &str) -> CreateTag {
    CreateTag {
        name: slug.to_uppercase(),
        color: color.to_string(),
        slug: slug.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_insert_and_list_tags() {
        let pool = test_pool().await;
        assert!(insert_tag_if_absent(&pool, &sample_tag("breakfast", "#E26C2D")).await.unwrap());
        assert!(insert_tag_if_absent(&pool, &sample_tag("lunch", "#49B64E")).await.unwrap());
        // same slug again is skipped
        assert!(!insert_tag_if_absent(&pool, &sample_tag("breakfast", "#000000")).await.unwrap());

        let tags = list_tags(&pool).await.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(get_tag(&pool, tags[1].id).await.unwrap().slug, "lunch");
        assert!(matches!(get_tag(&pool, 99).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_tag_conflict() {
        let pool = test_pool().await;
        insert_tag_if_absent(&pool, &sample_tag("breakfast", "#E26C2D")).await.unwrap();

        let same_color = sample_tag("brunch", "#E26C2D");
        let conflict = find_tag_conflict(&pool, &same_color).await.unwrap();
        assert_eq!(conflict.map(|t| t.slug).as_deref(), Some("breakfast"));

        // An existing slug is a skip, not a conflict
        let same_slug = sample_tag("breakfast", "#000000");
        assert!(find_tag_conflict(&pool, &same_slug).await.unwrap().is_none());

        let fresh = sample_tag("lunch", "#49B64E");
        assert!(find_tag_conflict(&pool, &fresh).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_existing_tag_ids() {
        let pool = test_pool().await;
        insert_tag_if_absent(&pool, &sample_tag("breakfast", "#E26C2D")).await.unwrap();
        let tags = list_tags(&pool).await.unwrap();

        let existing = existing_tag_ids(&pool, &[tags[0].id, 999]).await.unwrap();
        assert_eq!(existing, vec![tags[0].id]);
        assert!(existing_tag_ids(&pool, &[]).await.unwrap().is_empty());
    }
}
