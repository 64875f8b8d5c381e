//! Application state for Foodgram.
//!
//! Contains the shared state that is passed to all handlers.

use std::sync::Arc;

use crate::config::{self, Config};
use crate::db::{self, DbPool};
use crate::services::{AuthService, MediaStorage};
use crate::Result;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DbPool,
    /// Configuration this state was built from.
    pub config: Arc<Config>,
    /// Authentication service.
    pub auth: AuthService,
    /// Recipe image storage.
    pub media: MediaStorage,
}

impl AppState {
    /// Create the application state from the global configuration.
    pub async fn new() -> Result<Self> {
        Self::with_config(config::config().clone()).await
    }

    /// Create the application state from an explicit configuration.
    ///
    /// Opens the pool and applies the schema.
    pub async fn with_config(config: Config) -> Result<Self> {
        let db = db::init_pool(config.database.sqlite_path()?).await?;
        db::initialize_schema(&db).await?;
        Ok(Self::from_parts(db, config))
    }

    /// Assemble the state around an existing pool.
    pub fn from_parts(db: DbPool, config: Config) -> Self {
        let auth = AuthService::new(db.clone());
        let media = MediaStorage::new(&config.media, &config.server.public_url);

        Self {
            db,
            config: Arc::new(config),
            auth,
            media,
        }
    }
}
