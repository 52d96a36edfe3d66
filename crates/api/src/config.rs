//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::ProductCheck;
use thiserror::Error;

/// Raised when a required variable is missing or a variable is set to an
/// unusable value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

impl ConfigError {
    /// The offending variable.
    pub fn var(&self) -> &'static str {
        match self {
            Self::Missing { var } | Self::Invalid { var, .. } => var,
        }
    }
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration. Immutable once loaded.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `"0.0.0.0"`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default `25`)
/// - `JWT_SECRET`: HS256 signing secret for bearer tokens (required)
/// - `REQUEST_TIMEOUT_SECS`: per-request deadline, at least 1 (default `10`)
/// - `CART_PRODUCT_CHECK`: `none`, `exists` or `in_stock` (default `none`)
/// - `RUN_MIGRATIONS`: apply migrations on start (default `true`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub request_timeout: Duration,
    pub cart_product_check: ProductCheck,
    pub run_migrations: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let log_format = match non_empty("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(invalid("LOG_FORMAT", other)),
        };

        let cart_product_check = match non_empty("CART_PRODUCT_CHECK") {
            None => ProductCheck::default(),
            Some(value) => value
                .parse::<ProductCheck>()
                .map_err(|_| invalid("CART_PRODUCT_CHECK", &value))?,
        };

        let run_migrations = match non_empty("RUN_MIGRATIONS").as_deref() {
            None => true,
            Some("true" | "1") => true,
            Some("false" | "0") => false,
            Some(other) => return Err(invalid("RUN_MIGRATIONS", other)),
        };

        let jwt_secret =
            non_empty("JWT_SECRET").ok_or(ConfigError::Missing { var: "JWT_SECRET" })?;

        let request_timeout_secs: u64 = parse_or(
            "REQUEST_TIMEOUT_SECS",
            non_empty("REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        if request_timeout_secs == 0 {
            return Err(invalid("REQUEST_TIMEOUT_SECS", "0"));
        }

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("PORT", non_empty("PORT"), DEFAULT_PORT)?,
            log_level: non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format,
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                non_empty("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
            jwt_secret,
            request_timeout: Duration::from_secs(request_timeout_secs),
            cart_product_check,
            run_migrations,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid(var: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| invalid(var, &v)),
    }
}
