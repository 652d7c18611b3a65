//! Shared intermediate aggregates
//!
//! Weekly buckets, per-part volume and trailing-window totals are derived
//! once per snapshot and handed to the periodization, risk and goal stages.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{BodyPart, Timeframe};
use crate::snapshot::{LogSnapshot, LookbackWindow};
use crate::weekly::{aggregate_weeks, WeekBucket, WeeklyTrend};

/// A snapshot fetched for the aggregates stage spans at least this many
/// weeks so the 30-day totals are complete.
pub const MIN_SNAPSHOT_WEEKS: u32 = 6;

/// Window to fetch for a given lookback
pub fn snapshot_window(lookback_weeks: u32) -> LookbackWindow {
  LookbackWindow::Weeks(lookback_weeks.max(MIN_SNAPSHOT_WEEKS))
}

/// ---------------------------------------------------------------------------
/// Trailing-Window Totals
/// ---------------------------------------------------------------------------

/// Activity in the trailing window (since, as_of]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeTotals {
  pub timeframe: Timeframe,
  pub since: DateTime<Utc>,
  pub total_volume: f64,
  pub body_part_volumes: BTreeMap<BodyPart, f64>,
  /// Sessions with a completion timestamp
  pub completed_sessions: u32,
  /// Normalized names of exercises with a completed set
  pub exercises_performed: BTreeSet<String>,
}

/// Key used to match exercise names regardless of case and padding
pub fn normalize_exercise_name(name: &str) -> String {
  name.trim().to_lowercase()
}

impl TimeframeTotals {
  pub fn compute(snapshot: &LogSnapshot, timeframe: Timeframe) -> Self {
    let since = snapshot.as_of - Duration::days(timeframe.days());
    let in_window = |ts: DateTime<Utc>| ts > since && ts <= snapshot.as_of;

    let mut total_volume = 0.0;
    let mut body_part_volumes = BTreeMap::new();
    let mut exercises_performed = BTreeSet::new();
    for set in snapshot.sets.iter().filter(|s| in_window(s.performed_at)) {
      total_volume += set.volume();
      *body_part_volumes.entry(set.body_part).or_insert(0.0) += set.volume();
      exercises_performed.insert(normalize_exercise_name(&set.exercise_name));
    }

    let completed_sessions = snapshot
      .sessions
      .iter()
      .filter(|s| s.is_completed() && in_window(s.started_at))
      .count() as u32;

    Self {
      timeframe,
      since,
      total_volume,
      body_part_volumes,
      completed_sessions,
      exercises_performed,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Training Aggregates
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingAggregates {
  pub as_of: DateTime<Utc>,
  pub lookback_weeks: u32,
  /// Buckets inside the lookback window, ascending
  pub weeks: Vec<WeekBucket>,
  pub trend: WeeklyTrend,
  /// Volume per body part inside the lookback window
  pub body_part_volumes: BTreeMap<BodyPart, f64>,
  pub last_7_days: TimeframeTotals,
  pub last_30_days: TimeframeTotals,
}

impl TrainingAggregates {
  /// Derive all shared aggregates from one snapshot. The snapshot may span
  /// more than `lookback_weeks`; week and body-part figures are narrowed to
  /// the lookback.
  pub fn compute(snapshot: &LogSnapshot, lookback_weeks: u32) -> Self {
    let lookback = snapshot.restrict(LookbackWindow::Weeks(lookback_weeks));

    let weeks = aggregate_weeks(&lookback.sets);
    let trend = WeeklyTrend::compute(&weeks);

    let mut body_part_volumes = BTreeMap::new();
    for set in &lookback.sets {
      *body_part_volumes.entry(set.body_part).or_insert(0.0) += set.volume();
    }

    let aggregates = Self {
      as_of: snapshot.as_of,
      lookback_weeks,
      weeks,
      trend,
      body_part_volumes,
      last_7_days: TimeframeTotals::compute(snapshot, Timeframe::Weekly),
      last_30_days: TimeframeTotals::compute(snapshot, Timeframe::Monthly),
    };

    debug!(
      user_id = snapshot.user_id,
      weeks = aggregates.weeks.len(),
      parts = aggregates.body_part_volumes.len(),
      sessions_7d = aggregates.last_7_days.completed_sessions,
      "computed training aggregates"
    );

    aggregates
  }

  pub fn totals(&self, timeframe: Timeframe) -> &TimeframeTotals {
    match timeframe {
      Timeframe::Weekly => &self.last_7_days,
      Timeframe::Monthly => &self.last_30_days,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
