//! User account queries.

use std::collections::HashMap;

use crate::error::FieldErrors;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::{is_unique_violation_on, DbPool};

// ============================================================================
// User Types
// ============================================================================

/// User role enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

/// User record from the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub date_joined: String,
}

impl User {
    pub fn role_enum(&self) -> UserRole {
        UserRole::from_str(&self.role)
    }
}

/// Input for creating a new user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: UserRole,
}

// ============================================================================
// User Queries
// ============================================================================

/// Create a new user.
///
/// Duplicate email or username is reported as a field validation error.
pub async fn create_user(pool: &DbPool, input: CreateUser) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password_hash, role)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.email)
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.password_hash)
    .bind(input.role.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation_on(&e, "users.email") {
            FieldErrors::single("email", "A user with that email already exists.").into()
        } else if is_unique_violation_on(&e, "users.username") {
            FieldErrors::single("username", "A user with that username already exists.").into()
        } else {
            Error::Database(e)
        }
    })
}

/// Get a user by ID.
pub async fn get_user(pool: &DbPool, id: i64) -> Result<User> {
    find_user(pool, id)
        .await?
        .ok_or_else(|| Error::not_found("User"))
}

/// Get a user by ID if present.
pub async fn find_user(pool: &DbPool, id: i64) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

/// Get a user by email (case-insensitive).
pub async fn get_user_by_email(pool: &DbPool, email: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

/// List users ordered by id.
pub async fn list_users(pool: &DbPool, limit: i64, offset: i64) -> Result<Vec<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)
}

/// Users with the given ids, keyed by id.
pub async fn users_by_ids(pool: &DbPool, ids: &[i64]) -> Result<HashMap<i64, User>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM users WHERE id IN (");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(")");

    let users: Vec<User> = qb.build_query_as().fetch_all(pool).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

/// Count all users.
pub async fn count_users(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Replace a user's password hash.
pub async fn set_password_hash(pool: &DbPool, id: i64, password_hash: &str) -> Result<()> {
    let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("User"));
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_user(n: u32) -> CreateUser {
    CreateUser {
        email: format!("cook{}@example.com", n),
        username: format!("cook{}", n),
        first_name: "Ann".into(),
        last_name: "Cook".into(),
        password_hash: "not-a-real-hash".into(),
        role: UserRole::User,
    }
}
