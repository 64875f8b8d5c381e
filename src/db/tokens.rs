//! Auth token queries.
//!
//! Only the SHA-256 hash of a token is stored; the 8-character prefix is
//! kept in clear for indexed lookup.

use crate::{Error, Result};
use sqlx::FromRow;

use super::DbPool;

/// Auth token record.
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub id: String,
    pub user_id: i64,
    pub token_prefix: String,
    pub token_hash: String,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub revoked_at: Option<String>,
}

impl AuthToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// Input for creating a token.
#[derive(Debug, Clone)]
pub struct CreateAuthToken {
    pub id: String,
    pub user_id: i64,
    pub token_prefix: String,
    pub token_hash: String,
}

/// Store a newly issued token.
pub async fn create_auth_token(pool: &DbPool, input: CreateAuthToken) -> Result<AuthToken> {
    sqlx::query_as::<_, AuthToken>(
        r#"
        INSERT INTO auth_tokens (id, user_id, token_prefix, token_hash)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.id)
    .bind(input.user_id)
    .bind(&input.token_prefix)
    .bind(&input.token_hash)
    .fetch_one(pool)
    .await
    .map_err(Error::Database)
}

/// Look up a token by its prefix.
pub async fn get_auth_token_by_prefix(pool: &DbPool, prefix: &str) -> Result<Option<AuthToken>> {
    sqlx::query_as::<_, AuthToken>("SELECT * FROM auth_tokens WHERE token_prefix = ?")
        .bind(prefix)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

/// Mark a token as revoked. Returns false if it was already revoked or missing.
pub async fn revoke_auth_token(pool: &DbPool, id: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE auth_tokens SET revoked_at = datetime('now') WHERE id = ? AND revoked_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Record token usage.
pub async fn touch_auth_token(pool: &DbPool, id: &str) -> Result<()> {
    sqlx::query("UPDATE auth_tokens SET last_used_at = datetime('now') WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
