//! Server configuration parsed from environment variables.
//!
//! Settings are read once at startup into [`ServerConfig`] and carried on
//! `AppState`. Parsing goes through a key lookup closure so tests can supply
//! values without touching the process environment.

use std::fmt;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CANVAS_FLUSH_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MODEL_ID: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing(_) => "E_CONFIG_MISSING",
            Self::Invalid { .. } => "E_CONFIG_INVALID",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// When set, every `/api` request must present it.
    pub shared_secret: Option<String>,
    pub flush_interval_ms: u64,
    /// Model for new root verses and for branches whose parent has none.
    pub default_model_id: String,
    pub max_tokens: u32,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("db_max_connections", &self.db_max_connections)
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| "<redacted>"))
            .field("flush_interval_ms", &self.flush_interval_ms)
            .field("default_model_id", &self.default_model_id)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `DATABASE_URL` is absent or a numeric
    /// setting does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = non_empty("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        Ok(Self {
            database_url,
            port: env_parse(&lookup, "PORT", DEFAULT_PORT)?,
            db_max_connections: env_parse(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            shared_secret: non_empty("CANVAS_SHARED_SECRET"),
            flush_interval_ms: env_parse(&lookup, "CANVAS_FLUSH_INTERVAL_MS", DEFAULT_CANVAS_FLUSH_INTERVAL_MS)?,
            default_model_id: non_empty("DEFAULT_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            max_tokens: env_parse(&lookup, "LLM_MAX_TOKENS", DEFAULT_LLM_MAX_TOKENS)?,
        })
    }
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
