use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// `None` when `DATABASE_URL` is unset; only commands that open a pool need it.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Explicit Chromium binary; `None` lets the launcher auto-detect one.
    pub browser_executable: Option<PathBuf>,
    pub browser_user_agent: String,
    pub scraper_page_load_timeout_secs: u64,
    /// How long to wait for the product title before a page counts as not ready.
    pub scraper_ready_timeout_secs: u64,
    /// Wait window for each optional field selector.
    pub scraper_element_wait_ms: u64,
    pub scraper_settle_delay_ms: u64,
    /// Total attempts per URL, including the first one.
    pub scraper_max_attempts: u32,
    pub scraper_retry_delay_secs: u64,
    pub http_timeout_secs: u64,
    pub import_delay_ms: u64,
}

impl AppConfig {
    /// Returns the database URL, or an error naming the missing variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("browser_executable", &self.browser_executable)
            .field("browser_user_agent", &self.browser_user_agent)
            .field(
                "scraper_page_load_timeout_secs",
                &self.scraper_page_load_timeout_secs,
            )
            .field(
                "scraper_ready_timeout_secs",
                &self.scraper_ready_timeout_secs,
            )
            .field("scraper_element_wait_ms", &self.scraper_element_wait_ms)
            .field("scraper_settle_delay_ms", &self.scraper_settle_delay_ms)
            .field("scraper_max_attempts", &self.scraper_max_attempts)
            .field("scraper_retry_delay_secs", &self.scraper_retry_delay_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("import_delay_ms", &self.import_delay_ms)
            .finish()
    }
}
