//! Analysis entry points
//!
//! `TrainingAnalytics` fetches one snapshot per call and runs the pure
//! analyses over it. Calls share no mutable state and may run concurrently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregates::{snapshot_window, TrainingAggregates};
use crate::body_parts::BodyPartAnalysis;
use crate::config::{validate_lookback, AnalysisConfig};
use crate::db::LogStore;
use crate::error::Result;
use crate::goals::{evaluate_goals, GoalProgress};
use crate::injury_risk::InjuryRiskReport;
use crate::periodization::PeriodizationAnalysis;
use crate::snapshot::{LookbackWindow, SnapshotKey};
use crate::symmetry::SymmetryAnalysis;
use crate::weekly::{WeekBucket, WeeklyTrend};

/// ---------------------------------------------------------------------------
/// Result Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyVolumeReport {
  pub user_id: i64,
  pub as_of: DateTime<Utc>,
  pub lookback_weeks: u32,
  pub weeks: Vec<WeekBucket>,
  pub trend: WeeklyTrend,
}

impl WeeklyVolumeReport {
  fn from_aggregates(user_id: i64, aggregates: &TrainingAggregates) -> Self {
    Self {
      user_id,
      as_of: aggregates.as_of,
      lookback_weeks: aggregates.lookback_weeks,
      weeks: aggregates.weeks.clone(),
      trend: aggregates.trend.clone(),
    }
  }
}

/// Every analysis over a single fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
  pub user_id: i64,
  pub as_of: DateTime<Utc>,
  pub lookback_weeks: u32,
  pub cache_key: SnapshotKey,
  pub weekly_volume: WeeklyVolumeReport,
  pub periodization: PeriodizationAnalysis,
  pub body_parts: BodyPartAnalysis,
  pub injury_risk: InjuryRiskReport,
  pub symmetry: SymmetryAnalysis,
  pub goals: Vec<GoalProgress>,
}

/// ---------------------------------------------------------------------------
/// Service
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TrainingAnalytics {
  store: LogStore,
  config: AnalysisConfig,
  /// Fixed evaluation time; wall clock when unset
  as_of: Option<DateTime<Utc>>,
}

impl TrainingAnalytics {
  pub fn new(store: LogStore, config: AnalysisConfig) -> Self {
    Self {
      store,
      config,
      as_of: None,
    }
  }

  /// Open the store named by the config
  pub async fn from_config(config: AnalysisConfig) -> Result<Self> {
    let store = LogStore::connect(config.database_url()?).await?;
    Ok(Self::new(store, config))
  }

  /// Evaluate every call as of `as_of` instead of the wall clock
  pub fn at(mut self, as_of: DateTime<Utc>) -> Self {
    self.as_of = Some(as_of);
    self
  }

  pub fn config(&self) -> &AnalysisConfig {
    &self.config
  }

  fn now(&self) -> DateTime<Utc> {
    self.as_of.unwrap_or_else(Utc::now)
  }

  async fn load_aggregates(
    &self,
    user_id: i64,
    lookback_weeks: u32,
  ) -> Result<TrainingAggregates> {
    validate_lookback(lookback_weeks)?;
    let snapshot = self
      .store
      .load_snapshot(user_id, self.now(), snapshot_window(lookback_weeks))
      .await?;
    Ok(TrainingAggregates::compute(&snapshot, lookback_weeks))
  }

  /// Monday-aligned weekly buckets over the lookback, with the weekly trend
  pub async fn weekly_volume(&self, user_id: i64, lookback_weeks: u32) -> Result<WeeklyVolumeReport> {
    let aggregates = self.load_aggregates(user_id, lookback_weeks).await?;
    Ok(WeeklyVolumeReport::from_aggregates(user_id, &aggregates))
  }

  pub async fn periodization(
    &self,
    user_id: i64,
    lookback_weeks: u32,
  ) -> Result<PeriodizationAnalysis> {
    let aggregates = self.load_aggregates(user_id, lookback_weeks).await?;
    Ok(PeriodizationAnalysis::compute(&aggregates.weeks))
  }

  /// All-time distribution, imbalance and undertraining, plus a rolling
  /// history of `history_weeks`
  pub async fn body_parts(&self, user_id: i64, history_weeks: u32) -> Result<BodyPartAnalysis> {
    validate_lookback(history_weeks)?;
    let as_of = self.now();
    let snapshot = self
      .store
      .load_snapshot(user_id, as_of, LookbackWindow::AllTime)
      .await?;
    Ok(BodyPartAnalysis::compute(&snapshot.sets, as_of, history_weeks))
  }

  pub async fn injury_risk(&self, user_id: i64, lookback_weeks: u32) -> Result<InjuryRiskReport> {
    let aggregates = self.load_aggregates(user_id, lookback_weeks).await?;
    Ok(Self::risk_from(&aggregates))
  }

  pub async fn symmetry(&self, user_id: i64, lookback_weeks: u32) -> Result<SymmetryAnalysis> {
    validate_lookback(lookback_weeks)?;
    let snapshot = self
      .store
      .load_snapshot(user_id, self.now(), LookbackWindow::Weeks(lookback_weeks))
      .await?;
    Ok(SymmetryAnalysis::compute(&snapshot.sets, self.config.symmetry))
  }

  /// Progress of every active goal; each goal's own timeframe sets its window
  pub async fn goal_progress(&self, user_id: i64) -> Result<Vec<GoalProgress>> {
    let goals = self.store.fetch_active_goals(user_id).await?;
    if goals.is_empty() {
      return Ok(Vec::new());
    }
    let aggregates = self.load_aggregates(user_id, 1).await?;
    Ok(evaluate_goals(&goals, &aggregates))
  }

  /// Every analysis from one all-time fetch
  pub async fn full_report(&self, user_id: i64, lookback_weeks: u32) -> Result<TrainingReport> {
    validate_lookback(lookback_weeks)?;
    let as_of = self.now();

    let snapshot = self
      .store
      .load_snapshot(user_id, as_of, LookbackWindow::AllTime)
      .await?;
    let goals = self.store.fetch_active_goals(user_id).await?;

    let aggregates = TrainingAggregates::compute(&snapshot, lookback_weeks);
    let lookback = snapshot.restrict(LookbackWindow::Weeks(lookback_weeks));

    let report = TrainingReport {
      user_id,
      as_of,
      lookback_weeks,
      cache_key: lookback.cache_key(),
      weekly_volume: WeeklyVolumeReport::from_aggregates(user_id, &aggregates),
      periodization: PeriodizationAnalysis::compute(&aggregates.weeks),
      body_parts: BodyPartAnalysis::compute(&snapshot.sets, as_of, self.config.history_weeks),
      injury_risk: Self::risk_from(&aggregates),
      symmetry: SymmetryAnalysis::compute(&lookback.sets, self.config.symmetry),
      goals: evaluate_goals(&goals, &aggregates),
    };

    info!(
      user_id,
      lookback_weeks,
      sets = snapshot.sets.len(),
      risk_score = report.injury_risk.risk_score,
      "built training report"
    );

    Ok(report)
  }

  fn risk_from(aggregates: &TrainingAggregates) -> InjuryRiskReport {
    InjuryRiskReport::compute(
      &aggregates.weeks,
      &aggregates.body_part_volumes,
      aggregates.last_7_days.completed_sessions as usize,
      aggregates.as_of,
    )
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
