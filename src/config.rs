use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// The server side only needs `database_url` and `session_ttl_hours`; the
/// client side only needs `authority_url`, `request_timeout_secs` and
/// (optionally) `cache_dir`. Both halves read the same struct so a combined
/// test binary can drive them together.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL (e.g. sqlite://tether.db, postgres://...)
    pub database_url: String,

    /// Session lifetime in hours (default: 24)
    pub session_ttl_hours: u64,

    /// Base URL of the session authority, consumed by the client cache
    /// (e.g. https://auth.example.com)
    pub authority_url: String,

    /// Timeout for authority round trips, in seconds (default: 5).
    /// A timed-out verification is treated as a failed one.
    pub request_timeout_secs: u64,

    /// Directory for the encrypted session cache file. When unset, a
    /// per-user default is used (`%APPDATA%` on Windows, `~/.tether`
    /// elsewhere).
    pub cache_dir: Option<PathBuf>,

    /// Environment: development, production, test
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://tether.db?mode=rwc".to_string()),
            session_ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            authority_url: std::env::var("AUTHORITY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            cache_dir: std::env::var("CACHE_DIR").ok().map(PathBuf::from),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }

    /// Session lifetime as a chrono duration.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours as i64)
    }
}
