//! Print a training analysis for one user as JSON.
//!
//! Reads `LIFT_INSIGHTS_*` settings from the environment (and `.env`).

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use lift_insights::config::AnalysisConfig;
use lift_insights::logging::init_tracing;
use lift_insights::{AnalyticsError, TrainingAnalytics};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Analysis {
  /// Every analysis from one fetch
  Full,
  WeeklyVolume,
  Periodization,
  BodyParts,
  InjuryRisk,
  Symmetry,
  Goals,
}

#[derive(Parser)]
#[command(name = "insights-report")]
#[command(about = "Print training analytics for a user as JSON")]
struct Cli {
  /// Owner of the training log
  #[arg(long)]
  user_id: i64,

  /// Weeks to look back (defaults to LIFT_INSIGHTS_LOOKBACK_WEEKS)
  #[arg(long, allow_negative_numbers = true)]
  lookback_weeks: Option<i64>,

  #[arg(long, value_enum, default_value_t = Analysis::Full)]
  analysis: Analysis,
}

/// Failures of a report run: the analysis itself or writing its output
#[derive(Debug, thiserror::Error)]
enum ReportError {
  #[error(transparent)]
  Analytics(#[from] AnalyticsError),

  #[error("Could not encode report: {0}")]
  Encode(#[from] serde_json::Error),
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ReportError> {
  Ok(serde_json::to_string_pretty(value)?)
}

async fn run(cli: Cli, config: AnalysisConfig) -> Result<String, ReportError> {
  let lookback = match cli.lookback_weeks {
    Some(weeks) => u32::try_from(weeks).map_err(|_| {
      AnalyticsError::InvalidParameters(format!("lookback must be positive, got {}", weeks))
    })?,
    None => config.lookback_weeks,
  };
  let history_weeks = config.history_weeks;
  let engine = TrainingAnalytics::from_config(config).await?;

  match cli.analysis {
    Analysis::Full => to_json(&engine.full_report(cli.user_id, lookback).await?),
    Analysis::WeeklyVolume => to_json(&engine.weekly_volume(cli.user_id, lookback).await?),
    Analysis::Periodization => to_json(&engine.periodization(cli.user_id, lookback).await?),
    Analysis::BodyParts => to_json(&engine.body_parts(cli.user_id, history_weeks).await?),
    Analysis::InjuryRisk => to_json(&engine.injury_risk(cli.user_id, lookback).await?),
    Analysis::Symmetry => to_json(&engine.symmetry(cli.user_id, lookback).await?),
    Analysis::Goals => to_json(&engine.goal_progress(cli.user_id).await?),
  }
}

#[tokio::main]
async fn main() -> ExitCode {
  dotenvy::dotenv().ok();
  let cli = Cli::parse();

  let config = match AnalysisConfig::from_env() {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{}", e);
      return ExitCode::from(2);
    }
  };

  if let Err(e) = init_tracing(&config.log_level) {
    eprintln!("{}", e);
  }

  match run(cli, config).await {
    Ok(json) => {
      println!("{}", json);
      ExitCode::SUCCESS
    }
    Err(ReportError::Analytics(e)) => {
      error!(error = %e, "analysis failed");
      // Same JSON shape the library serializes errors with
      match serde_json::to_string_pretty(&e) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", e),
      }
      ExitCode::FAILURE
    }
    Err(e @ ReportError::Encode(_)) => {
      error!(error = %e, "report output failed");
      eprintln!("{}", e);
      ExitCode::FAILURE
    }
  }
}
