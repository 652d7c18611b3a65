//! Error types for the analytics engine

use serde::{Deserialize, Serialize};

/// Failures surfaced to callers of the analysis entry points.
///
/// Empty input is never an error: every analysis has an explicit
/// "no data" result instead.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AnalyticsError {
  #[error("Could not read source data: {0}")]
  SourceRead(String),

  #[error("Invalid parameters: {0}")]
  InvalidParameters(String),

  #[error("Configuration error: {0}")]
  Config(String),
}

impl From<sqlx::Error> for AnalyticsError {
  fn from(e: sqlx::Error) -> Self {
    AnalyticsError::SourceRead(e.to_string())
  }
}

impl From<sqlx::migrate::MigrateError> for AnalyticsError {
  fn from(e: sqlx::migrate::MigrateError) -> Self {
    AnalyticsError::SourceRead(format!("migration failed: {}", e))
  }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
