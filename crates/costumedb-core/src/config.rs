use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid. A missing `DATABASE_URL` is
/// reported later, by [`AppConfig::require_database_url`].
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
/// Returns `ConfigError` if a value is invalid. A missing `DATABASE_URL` is
/// reported later, by [`AppConfig::require_database_url`].
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
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = lookup("DATABASE_URL")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let env = parse_environment(&or_default("COSTUMEDB_ENV", "development"))?;
    let log_level = or_default("COSTUMEDB_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("COSTUMEDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("COSTUMEDB_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "COSTUMEDB_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "min connections ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        });
    }
    let db_acquire_timeout_secs = parse_u64("COSTUMEDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let browser_executable = lookup("COSTUMEDB_BROWSER_EXECUTABLE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let browser_user_agent = or_default("COSTUMEDB_BROWSER_USER_AGENT", DEFAULT_BROWSER_USER_AGENT);

    let scraper_page_load_timeout_secs = parse_u64("COSTUMEDB_SCRAPER_PAGE_LOAD_TIMEOUT_SECS", "30")?;
    let scraper_ready_timeout_secs = parse_u64("COSTUMEDB_SCRAPER_READY_TIMEOUT_SECS", "10")?;
    let scraper_element_wait_ms = parse_u64("COSTUMEDB_SCRAPER_ELEMENT_WAIT_MS", "5000")?;
    let scraper_settle_delay_ms = parse_u64("COSTUMEDB_SCRAPER_SETTLE_DELAY_MS", "3000")?;
    let scraper_max_attempts = parse_u32("COSTUMEDB_SCRAPER_MAX_ATTEMPTS", "3")?;
    if scraper_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "COSTUMEDB_SCRAPER_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let scraper_retry_delay_secs = parse_u64("COSTUMEDB_SCRAPER_RETRY_DELAY_SECS", "5")?;
    let http_timeout_secs = parse_u64("COSTUMEDB_HTTP_TIMEOUT_SECS", "30")?;
    let import_delay_ms = parse_u64("COSTUMEDB_IMPORT_DELAY_MS", "0")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        browser_executable,
        browser_user_agent,
        scraper_page_load_timeout_secs,
        scraper_ready_timeout_secs,
        scraper_element_wait_ms,
        scraper_settle_delay_ms,
        scraper_max_attempts,
        scraper_retry_delay_secs,
        http_timeout_secs,
        import_delay_ms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "COSTUMEDB_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
