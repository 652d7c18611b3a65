//! Environment-driven configuration

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::symmetry::SymmetryThresholds;

pub const DATABASE_URL_VAR: &str = "LIFT_INSIGHTS_DATABASE_URL";
pub const LOOKBACK_WEEKS_VAR: &str = "LIFT_INSIGHTS_LOOKBACK_WEEKS";
pub const HISTORY_WEEKS_VAR: &str = "LIFT_INSIGHTS_HISTORY_WEEKS";
pub const SYMMETRY_MODERATE_VAR: &str = "LIFT_INSIGHTS_SYMMETRY_MODERATE_PCT";
pub const SYMMETRY_HIGH_VAR: &str = "LIFT_INSIGHTS_SYMMETRY_HIGH_PCT";
pub const LOG_VAR: &str = "LIFT_INSIGHTS_LOG";

pub const DEFAULT_LOOKBACK_WEEKS: u32 = 12;
pub const DEFAULT_HISTORY_WEEKS: u32 = 12;
/// Upper bound on any week-based lookback (ten years)
pub const MAX_LOOKBACK_WEEKS: u32 = 520;

/// Reject lookbacks outside 1..=520 weeks
pub fn validate_lookback(weeks: u32) -> Result<()> {
  if weeks == 0 || weeks > MAX_LOOKBACK_WEEKS {
    return Err(AnalyticsError::InvalidParameters(format!(
      "lookback must be between 1 and {} weeks, got {}",
      MAX_LOOKBACK_WEEKS, weeks
    )));
  }
  Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
  pub database_url: Option<String>,
  pub lookback_weeks: u32,
  pub history_weeks: u32,
  pub symmetry: SymmetryThresholds,
  pub log_level: String,
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    Self {
      database_url: None,
      lookback_weeks: DEFAULT_LOOKBACK_WEEKS,
      history_weeks: DEFAULT_HISTORY_WEEKS,
      symmetry: SymmetryThresholds::default(),
      log_level: "info".to_string(),
    }
  }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
  match env::var(key) {
    Ok(raw) if !raw.trim().is_empty() => raw
      .trim()
      .parse::<T>()
      .map_err(|_| AnalyticsError::Config(format!("{} has an invalid value: {}", key, raw))),
    _ => Ok(default),
  }
}

impl AnalysisConfig {
  pub fn from_env() -> Result<Self> {
    let defaults = Self::default();

    let config = Self {
      database_url: env::var(DATABASE_URL_VAR).ok().filter(|url| !url.trim().is_empty()),
      lookback_weeks: parse_var(LOOKBACK_WEEKS_VAR, defaults.lookback_weeks)?,
      history_weeks: parse_var(HISTORY_WEEKS_VAR, defaults.history_weeks)?,
      symmetry: SymmetryThresholds {
        moderate_pct: parse_var(SYMMETRY_MODERATE_VAR, defaults.symmetry.moderate_pct)?,
        high_pct: parse_var(SYMMETRY_HIGH_VAR, defaults.symmetry.high_pct)?,
      },
      log_level: env::var(LOG_VAR).unwrap_or(defaults.log_level),
    };

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    for (key, weeks) in [
      (LOOKBACK_WEEKS_VAR, self.lookback_weeks),
      (HISTORY_WEEKS_VAR, self.history_weeks),
    ] {
      if weeks == 0 || weeks > MAX_LOOKBACK_WEEKS {
        return Err(AnalyticsError::Config(format!(
          "{} must be between 1 and {}, got {}",
          key, MAX_LOOKBACK_WEEKS, weeks
        )));
      }
    }

    let SymmetryThresholds { moderate_pct, high_pct } = self.symmetry;
    if !(moderate_pct.is_finite() && high_pct.is_finite()) || moderate_pct < 0.0 {
      return Err(AnalyticsError::Config(
        "symmetry thresholds must be non-negative numbers".to_string(),
      ));
    }
    if moderate_pct >= high_pct {
      return Err(AnalyticsError::Config(format!(
        "{} ({}) must be below {} ({})",
        SYMMETRY_MODERATE_VAR, moderate_pct, SYMMETRY_HIGH_VAR, high_pct
      )));
    }

    Ok(())
  }

  /// The store URL, required by anything that opens the log store
  pub fn database_url(&self) -> Result<&str> {
    self
      .database_url
      .as_deref()
      .ok_or_else(|| AnalyticsError::Config(format!("{} is not set", DATABASE_URL_VAR)))
  }
}
