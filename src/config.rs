//! Environment-driven configuration shared by every handler binary

use thiserror::Error;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Admin credential used when `site_settings` has no stored value
    pub default_admin_password: String,
    /// Verify auth tokens against stored sessions and the orders admin header
    /// against the stored admin password
    pub strict_auth: bool,
    pub placeholder_images: bool,
    /// Sessions older than this stop authenticating and are purged on the next login
    pub session_ttl_days: i32,
    /// Apply the bundled migrations during start-up
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Config {
            database_url,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 2)?,
            acquire_timeout_secs: parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            default_admin_password: lookup("DEFAULT_ADMIN_PASSWORD")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
            strict_auth: parse_flag(&lookup, "STRICT_AUTH", false)?,
            placeholder_images: parse_flag(&lookup, "PLACEHOLDER_IMAGES", true)?,
            session_ttl_days: parse_positive(&lookup, "SESSION_TTL_DAYS", 30)?,
            run_migrations: parse_flag(&lookup, "RUN_MIGRATIONS", false)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn parse_positive<F>(lookup: &F, name: &'static str, default: i32) -> Result<i32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, name, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid { name, value: value.to_string() });
    }
    Ok(value)
}

fn parse_flag<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
    }
}
