//! Tracing subscriber setup for binaries. The library itself only emits events.

use std::env;

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{AnalyticsError, Result};

/// Build the filter from `RUST_LOG`, falling back to `default_level`
pub fn env_filter(default_level: &str) -> EnvFilter {
  let filter = env::var("RUST_LOG").map_or_else(
    |_| EnvFilter::new(default_level),
    |directive| EnvFilter::new(&directive),
  );

  // sqlx logs every statement at info
  filter.add_directive(
    "sqlx::query=warn"
      .parse()
      .unwrap_or_else(|_| tracing::Level::WARN.into()),
  )
}

/// Install a global fmt subscriber writing to stderr
pub fn init_tracing(default_level: &str) -> Result<()> {
  fmt()
    .with_env_filter(env_filter(default_level))
    .with_target(true)
    .with_writer(std::io::stderr)
    .try_init()
    .map_err(|e| AnalyticsError::Config(format!("failed to initialize tracing: {}", e)))
}
