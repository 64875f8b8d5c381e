//! Subscription (user follows author) queries.

use std::collections::HashSet;

use sqlx::{QueryBuilder, Sqlite};

use crate::{Error, Result};

use super::{is_unique_violation_on, DbPool, User};

/// Follow an author.
///
/// Self-subscription and duplicates are rejected with a relation error.
pub async fn create_subscription(pool: &DbPool, user_id: i64, author_id: i64) -> Result<()> {
    if user_id == author_id {
        return Err(Error::Relation("You cannot subscribe to yourself.".into()));
    }

    sqlx::query("INSERT INTO subscriptions (user_id, author_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, "subscriptions.") {
                Error::Relation("You are already subscribed to this author.".into())
            } else {
                Error::Database(e)
            }
        })?;

    Ok(())
}

/// Unfollow an author. Returns false when no subscription existed.
pub async fn delete_subscription(pool: &DbPool, user_id: i64, author_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND author_id = ?")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Which of `author_ids` the user follows.
pub async fn subscribed_author_ids(
    pool: &DbPool,
    user_id: i64,
    author_ids: &[i64],
) -> Result<HashSet<i64>> {
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT author_id FROM subscriptions WHERE user_id = ");
    qb.push_bind(user_id);
    qb.push(" AND author_id IN (");
    let mut ids = qb.separated(", ");
    for id in author_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");

    let rows: Vec<(i64,)> = qb.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Authors the user follows, ordered by author id.
pub async fn list_subscribed_authors(
    pool: &DbPool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.* FROM users u
        INNER JOIN subscriptions s ON s.author_id = u.id
        WHERE s.user_id = ?
        ORDER BY u.id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(Error::Database)
}

/// Number of authors the user follows.
pub async fn count_subscriptions(pool: &DbPool, user_id: i64) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
