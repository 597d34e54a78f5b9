//! Logging and tracing initialization.
//!
//! The log level is controlled via `RUST_LOG`, e.g.:
//!
//! ```bash
//! RUST_LOG=tether_auth=debug,sqlx=warn cargo run
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with sensible defaults.
///
/// Call once at startup, before touching the database or the cache. The
/// level comes from `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if called more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize logging with an explicit level instead of `RUST_LOG`.
///
/// # Panics
///
/// Panics if called more than once.
pub fn init_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
