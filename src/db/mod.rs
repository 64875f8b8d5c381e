//! Database layer for Foodgram.
//!
//! Provides SQLite connection pooling and query modules
//! for all domain entities.

mod ingredients;
mod lists;
mod pool;
mod recipes;
mod subscriptions;
mod tags;
mod tokens;
mod users;

pub use ingredients::*;
pub use lists::*;
pub use pool::{create_pool_with_config, health_check, PoolConfig};
pub use recipes::*;
pub use subscriptions::*;
pub use tags::*;
pub use tokens::*;
pub use users::*;

use crate::Result;
use tracing::info;

/// Type alias for the SQLite connection pool.
pub type DbPool = sqlx::SqlitePool;

/// Initialize the database connection pool.
///
/// Creates parent directories if needed and configures SQLite with
/// WAL journaling and foreign keys.
pub async fn init_pool(path: &str) -> Result<DbPool> {
    let pool = create_pool_with_config(path, PoolConfig::for_path(path)).await?;

    info!("Database pool initialized: {}", path);

    Ok(pool)
}

/// Initialize the database schema.
///
/// Applies the complete schema from schema.sql inside one transaction.
/// Uses IF NOT EXISTS clauses so it's safe to run multiple times.
pub async fn initialize_schema(pool: &DbPool) -> Result<()> {
    let schema = include_str!("../../schema.sql");

    info!("Initializing database schema");

    let mut tx = pool.begin().await?;
    for statement in schema.split(';') {
        // Strip comment lines, keeping only actual SQL
        let clean_stmt: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let clean_stmt = clean_stmt.trim();
        if clean_stmt.is_empty() {
            continue;
        }
        sqlx::query(clean_stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Database schema initialized successfully");

    Ok(())
}

/// True when the error is a UNIQUE constraint violation on `column`
/// (e.g. `users.email`).
pub(crate) fn is_unique_violation_on(err: &sqlx::Error, column: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.message().contains(column)
        }
        _ => false,
    }
}

/// Build a pool with the schema applied, for tests.
#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let pool = init_pool(":memory:").await.unwrap();
    initialize_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_initialization() {
        let pool = test_pool().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();

        for expected in [
            "users",
            "auth_tokens",
            "subscriptions",
            "tags",
            "ingredients",
            "recipes",
            "recipe_tags",
            "recipe_ingredients",
            "favorites",
            "shopping_cart",
        ] {
            assert!(table_names.contains(&expected), "{} table missing", expected);
        }
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = test_pool().await;
        initialize_schema(&pool).await.unwrap();
    }
}
