//! Configuration management for Foodgram.
//!
//! Loads configuration from environment variables (and `.env`):
//! - Server bind address and public URL used to build absolute links
//! - Database settings using the `DB_*` / `POSTGRES_*` variable names
//! - Media, static files, pagination and data loader locations

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::{Error, Result};

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Initialize configuration (call once at startup)
pub fn init() -> &'static Config {
    config()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub statics: StaticConfig,
    pub pagination: PaginationConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used for pagination links and image URLs, without a trailing slash.
    pub public_url: String,
    pub max_body_size: usize,
}

/// Database backend selected by `DB_ENGINE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEngine {
    Sqlite,
    Postgres,
}

impl std::str::FromStr for DbEngine {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" | "django.db.backends.sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "django.db.backends.postgresql" => Ok(Self::Postgres),
            other => Err(format!("Unknown database engine: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub engine: DbEngine,
    /// Database name; for SQLite this is the file path (or `:memory:`).
    pub name: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl DatabaseConfig {
    /// In-memory SQLite database, used by tests.
    pub fn in_memory() -> Self {
        Self {
            engine: DbEngine::Sqlite,
            name: ":memory:".to_string(),
            user: None,
            password: None,
            host: None,
            port: None,
        }
    }

    /// Resolve the SQLite path, rejecting engines this build cannot serve.
    pub fn sqlite_path(&self) -> Result<&str> {
        match self.engine {
            DbEngine::Sqlite => Ok(&self.name),
            DbEngine::Postgres => Err(Error::Config(format!(
                "DB_ENGINE=postgresql is not supported (host {}:{}); use sqlite",
                self.host.as_deref().unwrap_or("?"),
                self.port.map(|p| p.to_string()).unwrap_or_else(|| "?".into()),
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub root: PathBuf,
    /// URL prefix media is served under, with leading and trailing slash.
    pub url: String,
    pub max_image_size: usize,
}

#[derive(Debug, Clone)]
pub struct StaticConfig {
    pub root: PathBuf,
    pub source: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub page_size: u32,
    pub max_page_size: u32,
    /// Recipes embedded per author in subscription listings.
    pub recipes_limit: u32,
}

#[derive(Debug, Clone)]
pub struct DataConfig {
    pub dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_parse("PORT", 8000),
                public_url: env_or("PUBLIC_URL", "http://localhost:8000")
                    .trim_end_matches('/')
                    .to_string(),
                max_body_size: env_parse("MAX_BODY_SIZE", 20 * 1024 * 1024),
            },
            database: DatabaseConfig {
                engine: env_or("DB_ENGINE", "sqlite")
                    .parse()
                    .unwrap_or_else(|e: String| {
                        tracing::warn!("{}, falling back to sqlite", e);
                        DbEngine::Sqlite
                    }),
                name: env_or("DB_NAME", "./data/foodgram.db"),
                user: env::var("POSTGRES_USER").ok(),
                password: env::var("POSTGRES_PASSWORD").ok(),
                host: env::var("DB_HOST").ok(),
                port: env::var("DB_PORT").ok().and_then(|p| p.parse().ok()),
            },
            media: MediaConfig {
                root: PathBuf::from(env_or("MEDIA_ROOT", "./media")),
                url: normalize_url_prefix(&env_or("MEDIA_URL", "/media/")),
                max_image_size: env_parse("MAX_IMAGE_SIZE", 10 * 1024 * 1024), // 10MB
            },
            statics: StaticConfig {
                root: PathBuf::from(env_or("STATIC_ROOT", "./static")),
                source: PathBuf::from(env_or("STATIC_SOURCE", "./static_src")),
            },
            pagination: PaginationConfig {
                page_size: env_parse("PAGE_SIZE", 9),
                max_page_size: env_parse("MAX_PAGE_SIZE", 100),
                recipes_limit: env_parse("RECIPES_LIMIT", 3),
            },
            data: DataConfig {
                dir: PathBuf::from(env_or("DATA_DIR", "./data")),
            },
        }
    }

    /// Configuration for tests: in-memory database, media under `media_root`.
    pub fn for_tests(media_root: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                public_url: "http://testserver".to_string(),
                max_body_size: 20 * 1024 * 1024,
            },
            database: DatabaseConfig::in_memory(),
            media: MediaConfig {
                root: media_root.into(),
                url: "/media/".to_string(),
                max_image_size: 1024 * 1024,
            },
            statics: StaticConfig {
                root: PathBuf::from("./static"),
                source: PathBuf::from("./static_src"),
            },
            pagination: PaginationConfig {
                page_size: 9,
                max_page_size: 100,
                recipes_limit: 3,
            },
            data: DataConfig {
                dir: PathBuf::from("./data"),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn normalize_url_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_engine_parsing() {
        assert_eq!("sqlite".parse::<DbEngine>().unwrap(), DbEngine::Sqlite);
        assert_eq!(
            "django.db.backends.sqlite3".parse::<DbEngine>().unwrap(),
            DbEngine::Sqlite
        );
        assert_eq!(
            "django.db.backends.postgresql".parse::<DbEngine>().unwrap(),
            DbEngine::Postgres
        );
        assert!("oracle".parse::<DbEngine>().is_err());
    }

    #[test]
    fn test_postgres_engine_is_rejected() {
        let mut db = DatabaseConfig::in_memory();
        assert_eq!(db.sqlite_path().unwrap(), ":memory:");

        db.engine = DbEngine::Postgres;
        db.host = Some("db".into());
        db.port = Some(5432);
        let err = db.sqlite_path().unwrap_err();
        assert!(err.to_string().contains("db:5432"));
    }

    #[test]
    fn test_normalize_url_prefix() {
        assert_eq!(normalize_url_prefix("/media/"), "/media/");
        assert_eq!(normalize_url_prefix("media"), "/media/");
        assert_eq!(normalize_url_prefix("/"), "/");
    }
}
