//! Process settings read from the environment
//!
//! Each setting has a `MARQUEE_*` name and, where one is conventional, an
//! unprefixed fallback (`DATABASE_URL`, `HOST`, `PORT`, `RUST_LOG`). Values in
//! `.env` are loaded first and never override the real environment.

use crate::error::MarqueeError;
use std::time::Duration;
use url::Url;

/// Settings that can be read from the environment and checked before use
pub trait ConfigLoader: Sized {
    fn from_env() -> Result<Self, MarqueeError>;

    fn validate(&self) -> Result<(), MarqueeError>;
}

/// Catalog and interaction database
///
/// `MARQUEE_DATABASE_URL` (or `DATABASE_URL`) is required. Pool sizing and
/// timeouts come from `MARQUEE_DATABASE_{MAX_CONNECTIONS, MIN_CONNECTIONS,
/// CONNECT_TIMEOUT, IDLE_TIMEOUT}`, timeouts in seconds.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Upper bound on waiting for a pooled connection
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/marquee".to_string(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, MarqueeError> {
        let url = env_with_fallback("MARQUEE_DATABASE_URL", "DATABASE_URL").ok_or_else(|| {
            invalid(
                "MARQUEE_DATABASE_URL",
                "DATABASE_URL or MARQUEE_DATABASE_URL must be set",
            )
        })?;

        let defaults = Self::default();
        Ok(Self {
            url,
            max_connections: parsed("MARQUEE_DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: parsed("MARQUEE_DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout: Duration::from_secs(parsed(
                "MARQUEE_DATABASE_CONNECT_TIMEOUT",
                defaults.connect_timeout.as_secs(),
            )?),
            idle_timeout: Duration::from_secs(parsed(
                "MARQUEE_DATABASE_IDLE_TIMEOUT",
                defaults.idle_timeout.as_secs(),
            )?),
        })
    }

    fn validate(&self) -> Result<(), MarqueeError> {
        let parsed = Url::parse(&self.url).map_err(|e| {
            invalid("MARQUEE_DATABASE_URL", format!("Invalid DATABASE_URL: {}", e))
        })?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(invalid(
                "MARQUEE_DATABASE_URL",
                format!("Unsupported database scheme '{}'", parsed.scheme()),
            ));
        }

        if self.max_connections == 0 {
            return Err(invalid(
                "MARQUEE_DATABASE_MAX_CONNECTIONS",
                "max_connections must be greater than 0",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(invalid(
                "MARQUEE_DATABASE_MIN_CONNECTIONS",
                format!(
                    "min_connections ({}) exceeds max_connections ({})",
                    self.min_connections, self.max_connections
                ),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(invalid(
                "MARQUEE_DATABASE_CONNECT_TIMEOUT",
                "connect_timeout must be at least one second",
            ));
        }

        Ok(())
    }
}

/// HTTP listener and log level
///
/// `MARQUEE_SERVICE_HOST`/`HOST` (0.0.0.0), `MARQUEE_SERVICE_PORT`/`PORT`
/// (5000), `MARQUEE_SERVICE_WORKERS` (CPU count) and
/// `MARQUEE_SERVICE_LOG_LEVEL`/`RUST_LOG` (info).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Plain level or a full `EnvFilter` directive
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            workers: num_cpus::get(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ConfigLoader for ServiceConfig {
    fn from_env() -> Result<Self, MarqueeError> {
        let defaults = Self::default();
        let port_key = if std::env::var_os("MARQUEE_SERVICE_PORT").is_some() {
            "MARQUEE_SERVICE_PORT"
        } else {
            "PORT"
        };

        Ok(Self {
            host: env_with_fallback("MARQUEE_SERVICE_HOST", "HOST").unwrap_or(defaults.host),
            port: parsed(port_key, defaults.port)?,
            workers: parsed("MARQUEE_SERVICE_WORKERS", defaults.workers)?,
            log_level: env_with_fallback("MARQUEE_SERVICE_LOG_LEVEL", "RUST_LOG")
                .unwrap_or(defaults.log_level),
        })
    }

    fn validate(&self) -> Result<(), MarqueeError> {
        if self.port == 0 {
            return Err(invalid("MARQUEE_SERVICE_PORT", "port must be non-zero"));
        }
        if self.workers == 0 {
            return Err(invalid("MARQUEE_SERVICE_WORKERS", "workers must be non-zero"));
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        let is_directive = self.log_level.contains(&['=', ','][..]);
        if !is_directive && !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(invalid(
                "MARQUEE_SERVICE_LOG_LEVEL",
                format!(
                    "Invalid log_level '{}', expected one of {} or a filter directive",
                    self.log_level,
                    LEVELS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

fn invalid(key: &str, message: impl Into<String>) -> MarqueeError {
    MarqueeError::ConfigurationError {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

fn env_with_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .or_else(|_| std::env::var(fallback))
        .ok()
}

/// Parse `key` if set, otherwise return `default`
fn parsed<T>(key: &str, default: T) -> Result<T, MarqueeError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| invalid(key, format!("Failed to parse {}='{}': {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

/// Load `.env` if present
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}
