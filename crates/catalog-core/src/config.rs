use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_PORT: &str = "8083";
const DEFAULT_UPLOAD_DIR: &str = "./uploadProductImages";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:5174";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::{IpAddr, SocketAddr};
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("CATALOG_ENV", "development"))?;

    let host: IpAddr = parse_as("CATALOG_HOST", &or_default("CATALOG_HOST", "0.0.0.0"))?;
    let port: u16 = parse_as("PORT", &or_default("PORT", DEFAULT_PORT))?;
    let bind_addr = SocketAddr::new(host, port);

    let log_level = or_default("CATALOG_LOG_LEVEL", "info");
    let upload_dir = PathBuf::from(or_default("CATALOG_UPLOAD_DIR", DEFAULT_UPLOAD_DIR));
    let max_upload_bytes: usize = parse_as(
        "CATALOG_MAX_UPLOAD_BYTES",
        &or_default("CATALOG_MAX_UPLOAD_BYTES", "10485760"),
    )?;

    let cors_origins: Vec<String> = or_default("CATALOG_CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    if cors_origins.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "CATALOG_CORS_ORIGINS".to_string(),
            reason: "at least one origin is required".to_string(),
        });
    }

    let db_max_connections: u32 = parse_as(
        "CATALOG_DB_MAX_CONNECTIONS",
        &or_default("CATALOG_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_as(
        "CATALOG_DB_MIN_CONNECTIONS",
        &or_default("CATALOG_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs: u64 = parse_as(
        "CATALOG_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("CATALOG_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "CATALOG_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "min connections ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        upload_dir,
        max_upload_bytes,
        cors_origins,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CATALOG_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
