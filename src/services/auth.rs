//! Auth service: password hashing, token issue, validation and logout.
//!
//! Token format: `fg_{prefix}_{secret}` where:
//! - `fg_` is a fixed prefix for identification
//! - `{prefix}` is 8 chars used for database lookup (stored as `token_prefix`)
//! - `{secret}` is the remaining secret; the full token is hashed and
//!   stored as `token_hash`

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::db::{self, CreateAuthToken, DbPool, User};
use crate::error::{Error, Result};

const TOKEN_PREFIX: &str = "fg_";
const LOOKUP_PREFIX_LEN: usize = 8;

/// Service for authentication.
#[derive(Clone)]
pub struct AuthService {
    db: DbPool,
}

impl AuthService {
    /// Create a new auth service.
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Exchange email and password for a new token.
    ///
    /// Unknown email, wrong password and inactive accounts all yield
    /// the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let user = db::get_user_by_email(&self.db, email)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        if !user.is_active || !verify_password(password, &user.password_hash) {
            debug!(user_id = user.id, "Login rejected");
            return Err(Error::InvalidCredentials);
        }

        let token = self.issue_token(user.id).await?;
        info!(user_id = user.id, "User logged in");
        Ok(token)
    }

    /// Create and store a token for a user, returning the raw token.
    pub async fn issue_token(&self, user_id: i64) -> Result<String> {
        let prefix = nanoid::nanoid!(LOOKUP_PREFIX_LEN);
        let secret = nanoid::nanoid!(32);
        let token = format!("{}{}_{}", TOKEN_PREFIX, prefix, secret);

        db::create_auth_token(
            &self.db,
            CreateAuthToken {
                id: uuid::Uuid::new_v4().to_string(),
                user_id,
                token_prefix: prefix,
                token_hash: hash_token(&token),
            },
        )
        .await?;

        Ok(token)
    }

    /// Validate a raw token, returning the token id and its active owner.
    pub async fn validate_token(&self, token: &str) -> Result<(String, User)> {
        let prefix = lookup_prefix(token).ok_or(Error::InvalidToken)?;

        let row = db::get_auth_token_by_prefix(&self.db, prefix)
            .await?
            .ok_or(Error::InvalidToken)?;

        // Verify hash (timing-safe comparison)
        if !constant_time_eq(&hash_token(token), &row.token_hash) || row.is_revoked() {
            return Err(Error::InvalidToken);
        }

        let user = db::find_user(&self.db, row.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(Error::InvalidToken)?;

        Ok((row.id, user))
    }

    /// Revoke a token by id.
    pub async fn logout(&self, token_id: &str) -> Result<()> {
        db::revoke_auth_token(&self.db, token_id).await?;
        Ok(())
    }
}

/// Extract the lookup prefix from a raw token.
fn lookup_prefix(token: &str) -> Option<&str> {
    let body = token.strip_prefix(TOKEN_PREFIX)?;
    // At least the prefix plus separator and one secret char
    if body.len() < LOOKUP_PREFIX_LEN + 2 {
        return None;
    }
    body.get(..LOOKUP_PREFIX_LEN)
}

/// Hash a token using SHA-256.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Hash a password with Argon2id and a random salt (PHC string format).
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::Internal(format!("Salt encoding failed: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored PHC hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
