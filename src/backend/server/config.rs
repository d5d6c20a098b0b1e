/**
 * Server Configuration
 *
 * # Configuration Sources
 *
 * Later sources override earlier ones:
 *
 * 1. Built-in defaults
 * 2. TOML file named by `CHAT_CONFIG` (optional)
 * 3. Environment variables (a `.env` file is loaded first by the binary)
 *
 * | Variable | Field |
 * |---|---|
 * | `SERVER_HOST` | `host` |
 * | `SERVER_PORT` | `port` |
 * | `DATABASE_URL` | `database_url` |
 * | `JWT_SECRET` | `jwt_secret` (required) |
 * | `HISTORY_PAGE_SIZE` | `history_page_size` |
 * | `HISTORY_MAX_PAGE_SIZE` | `history_max_page_size` |
 * | `MAX_MESSAGE_LEN` | `max_message_len` |
 * | `DB_MAX_CONNECTIONS` | `db_max_connections` |
 * | `DB_ACQUIRE_TIMEOUT_SECS` | `db_acquire_timeout_secs` |
 *
 * # Database
 *
 * The database is optional. Without `DATABASE_URL`, or when the
 * connection fails, the server runs on the in-memory backend.
 */
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::backend::chat::engine::ChatLimits;

/// Environment variable naming the optional TOML config file
pub const CONFIG_PATH_ENV: &str = "CHAT_CONFIG";

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingSecret,

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConfigError {
    fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub history_page_size: usize,
    pub history_max_page_size: usize,
    pub max_message_len: usize,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Interval of the idle broadcast channel janitor
    pub cleanup_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let limits = ChatLimits::default();
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            database_url: None,
            jwt_secret: String::new(),
            history_page_size: limits.history_page_size,
            history_max_page_size: limits.history_max_page_size,
            max_message_len: limits.max_message_len,
            db_max_connections: 10,
            db_acquire_timeout_secs: 5,
            cleanup_interval_secs: 300,
        }
    }
}

/// Shape of the optional TOML file; every key may be omitted
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub history_page_size: Option<usize>,
    pub history_max_page_size: Option<usize>,
    pub max_message_len: Option<usize>,
    pub db_max_connections: Option<u32>,
    pub db_acquire_timeout_secs: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(key, e.to_string()))
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load from `CHAT_CONFIG` and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Some(FileConfig::from_path(Path::new(&path))?),
            _ => None,
        };
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Merge defaults, an optional file, and a variable lookup
    pub fn from_sources<F>(file: Option<FileConfig>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(file) = file {
            config.apply_file(file);
        }

        if let Some(raw) = lookup("SERVER_HOST") {
            config.host = parse_var("SERVER_HOST", &raw)?;
        }
        if let Some(raw) = lookup("SERVER_PORT") {
            config.port = parse_var("SERVER_PORT", &raw)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = Some(url);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            config.jwt_secret = secret;
        }
        if let Some(raw) = lookup("HISTORY_PAGE_SIZE") {
            config.history_page_size = parse_var("HISTORY_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("HISTORY_MAX_PAGE_SIZE") {
            config.history_max_page_size = parse_var("HISTORY_MAX_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("MAX_MESSAGE_LEN") {
            config.max_message_len = parse_var("MAX_MESSAGE_LEN", &raw)?;
        }
        if let Some(raw) = lookup("DB_MAX_CONNECTIONS") {
            config.db_max_connections = parse_var("DB_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = lookup("DB_ACQUIRE_TIMEOUT_SECS") {
            config.db_acquire_timeout_secs = parse_var("DB_ACQUIRE_TIMEOUT_SECS", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if file.database_url.is_some() {
            self.database_url = file.database_url;
        }
        if let Some(secret) = file.jwt_secret {
            self.jwt_secret = secret;
        }
        if let Some(size) = file.history_page_size {
            self.history_page_size = size;
        }
        if let Some(size) = file.history_max_page_size {
            self.history_max_page_size = size;
        }
        if let Some(len) = file.max_message_len {
            self.max_message_len = len;
        }
        if let Some(count) = file.db_max_connections {
            self.db_max_connections = count;
        }
        if let Some(secs) = file.db_acquire_timeout_secs {
            self.db_acquire_timeout_secs = secs;
        }
        if let Some(secs) = file.cleanup_interval_secs {
            self.cleanup_interval_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.history_max_page_size == 0 {
            return Err(ConfigError::invalid("HISTORY_MAX_PAGE_SIZE", "must be at least 1"));
        }
        if self.history_page_size == 0 || self.history_page_size > self.history_max_page_size {
            return Err(ConfigError::invalid(
                "HISTORY_PAGE_SIZE",
                format!("must be between 1 and {}", self.history_max_page_size),
            ));
        }
        if self.max_message_len == 0 {
            return Err(ConfigError::invalid("MAX_MESSAGE_LEN", "must be at least 1"));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::invalid("DB_MAX_CONNECTIONS", "must be at least 1"));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::invalid("cleanup_interval_secs", "must be at least 1"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn limits(&self) -> ChatLimits {
        ChatLimits {
            max_message_len: self.max_message_len,
            history_page_size: self.history_page_size,
            history_max_page_size: self.history_max_page_size,
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// Builder for programmatic configuration (tests, embedding)
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = secret.into();
        self
    }

    pub fn history_page_size(mut self, size: usize) -> Self {
        self.config.history_page_size = size;
        self
    }

    pub fn history_max_page_size(mut self, size: usize) -> Self {
        self.config.history_max_page_size = size;
        self
    }

    pub fn max_message_len(mut self, len: usize) -> Self {
        self.config.max_message_len = len;
        self
    }

    pub fn cleanup_interval_secs(mut self, secs: u64) -> Self {
        self.config.cleanup_interval_secs = secs;
        self
    }

    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Connect to Postgres and run migrations
///
/// # Returns
///
/// - `Some(PgPool)` when `DATABASE_URL` is set, the connection succeeds
///   and the migrations ran
/// - `None` otherwise; the server then uses the in-memory backend
pub async fn load_database(config: &ServerConfig) -> Option<PgPool> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set. Using in-memory storage.");
        return None;
    };

    tracing::info!("Connecting to database...");

    let pool = match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            tracing::warn!("Falling back to in-memory storage.");
            return None;
        }
    };

    migrated(pool).await
}

/// Run migrations, giving the pool back only if they succeed
///
/// A pool whose schema is not current is closed, and the caller falls
/// back to in-memory storage like it does when the connection fails.
pub async fn migrated(pool: PgPool) -> Option<PgPool> {
    tracing::info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(()) => {
            tracing::info!("Database migrations completed successfully");
            Some(pool)
        }
        Err(e) => {
            tracing::error!("Failed to run database migrations: {}", e);
            tracing::warn!("Falling back to in-memory storage.");
            pool.close().await;
            None
        }
    }
}
