//! Logging setup
//!
//! One fmt subscriber for the process, configured from [`LoggingConfig`].
//! `RUST_LOG` takes precedence over the configured level.

use crate::config::{EditorConfig, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, else the configured level, else `info`
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Later calls keep the first one.
pub fn init_logging(config: &LoggingConfig) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(config.show_target)
        .with_ansi(config.ansi)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        tracing::debug!("Logging initialized at {}", config.level);
    }
}

/// Initialize logging from the editor config
pub fn init_from_config(config: &EditorConfig) {
    init_logging(&config.logging);
}

/// Initialize logging with defaults
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
