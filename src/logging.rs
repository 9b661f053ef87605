//! Logging setup for drivers and tests.
//!
//! Filter resolution: explicit directives, then `RUST_LOG`, then the
//! default directive.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// How the global subscriber is installed.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub directives: Option<String>,
    pub default_directive: String,
    pub include_targets: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: true,
        }
    }
}

impl LogConfig {
    fn resolve_filter(&self) -> Result<EnvFilter> {
        match &self.directives {
            Some(d) => EnvFilter::try_new(d).map_err(|e| anyhow!("invalid log directive `{d}`: {e}")),
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directive))),
        }
    }
}

/// Install the global subscriber with default settings.
pub fn init() -> Result<()> {
    init_with(&LogConfig::default())
}

/// Install the global subscriber.
pub fn init_with(config: &LogConfig) -> Result<()> {
    let filter = config.resolve_filter()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_targets)
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Install a test-friendly subscriber; later calls are no-ops.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}
