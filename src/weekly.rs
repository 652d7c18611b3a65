//! Weekly aggregation of completed sets
//!
//! Buckets sets into Monday-aligned weeks and computes volume, set count,
//! workout count and estimated intensity per week. Every downstream analysis
//! that reasons about weeks consumes these buckets.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::PerformedSet;

/// ---------------------------------------------------------------------------
/// Estimated 1RM / Intensity
/// ---------------------------------------------------------------------------

/// Epley one-rep-max estimate: weight * (1 + reps / 30)
pub fn estimated_one_rep_max(weight: f64, reps: u32) -> f64 {
  weight * (1.0 + reps as f64 / 30.0)
}

/// Lifted weight as a percentage of the estimated 1RM.
/// Bodyweight sets (1RM of 0) count as 0.
pub fn estimated_intensity(weight: f64, reps: u32) -> f64 {
  let one_rm = estimated_one_rep_max(weight, reps);
  if one_rm > 0.0 {
    weight / one_rm * 100.0
  } else {
    0.0
  }
}

/// ---------------------------------------------------------------------------
/// Week Keys
/// ---------------------------------------------------------------------------

/// Monday of the week containing `ts` (UTC)
pub fn week_start(ts: DateTime<Utc>) -> NaiveDate {
  let date = ts.date_naive();
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Midnight UTC at the start of the given day
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
  date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Monday-aligned week keys, `weeks` long, ending with the week containing `as_of`
pub fn trailing_week_keys(as_of: DateTime<Utc>, weeks: u32) -> Vec<NaiveDate> {
  let current = week_start(as_of);
  (0..weeks as i64)
    .rev()
    .map(|offset| current - Duration::weeks(offset))
    .collect()
}

/// ---------------------------------------------------------------------------
/// Week Buckets
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekBucket {
  /// Monday of the week
  pub week_start: NaiveDate,

  /// Sum of reps * weight
  pub volume: f64,

  pub set_count: u32,

  /// Distinct sessions with at least one set in the week
  pub workout_count: u32,

  /// Unweighted mean of per-set intensity (% of estimated 1RM)
  pub average_intensity: f64,
}

#[derive(Default)]
struct WeekAccumulator {
  volume: f64,
  set_count: u32,
  intensity_sum: f64,
  sessions: BTreeSet<i64>,
}

/// Bucket completed sets into weeks, ascending by week start.
/// Weeks without sets are omitted.
pub fn aggregate_weeks(sets: &[PerformedSet]) -> Vec<WeekBucket> {
  let mut weeks: BTreeMap<NaiveDate, WeekAccumulator> = BTreeMap::new();

  for set in sets {
    let acc = weeks.entry(week_start(set.performed_at)).or_default();
    acc.volume += set.volume();
    acc.set_count += 1;
    acc.intensity_sum += estimated_intensity(set.weight, set.reps);
    acc.sessions.insert(set.session_id);
  }

  weeks
    .into_iter()
    .map(|(week_start, acc)| WeekBucket {
      week_start,
      volume: acc.volume,
      set_count: acc.set_count,
      workout_count: acc.sessions.len() as u32,
      average_intensity: if acc.set_count > 0 {
        acc.intensity_sum / acc.set_count as f64
      } else {
        0.0
      },
    })
    .collect()
}

/// Volume per week over a fixed list of week keys, zero where no bucket exists
pub fn zero_filled_volumes(buckets: &[WeekBucket], keys: &[NaiveDate]) -> Vec<f64> {
  let by_week: BTreeMap<NaiveDate, f64> =
    buckets.iter().map(|b| (b.week_start, b.volume)).collect();
  keys
    .iter()
    .map(|key| by_week.get(key).copied().unwrap_or(0.0))
    .collect()
}

/// ---------------------------------------------------------------------------
/// Weekly Trend
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTrend {
  pub latest_week: Option<NaiveDate>,
  pub latest_volume: f64,
  pub previous_volume: Option<f64>,

  /// Week-over-week volume change percentage
  pub week_over_week_delta_pct: Option<f64>,

  /// Mean volume across the observed weeks
  pub average_weekly_volume: f64,
}

impl WeeklyTrend {
  pub fn compute(buckets: &[WeekBucket]) -> Self {
    let latest = buckets.last();
    let previous = buckets.len().checked_sub(2).and_then(|i| buckets.get(i));

    let latest_volume = latest.map(|b| b.volume).unwrap_or(0.0);
    let previous_volume = previous.map(|b| b.volume);

    let week_over_week_delta_pct = match previous_volume {
      Some(prev) if prev > 0.0 => Some((latest_volume - prev) / prev * 100.0),
      Some(_) if latest_volume > 0.0 => Some(100.0),
      _ => None,
    };

    let average_weekly_volume = if buckets.is_empty() {
      0.0
    } else {
      buckets.iter().map(|b| b.volume).sum::<f64>() / buckets.len() as f64
    };

    Self {
      latest_week: latest.map(|b| b.week_start),
      latest_volume,
      previous_volume,
      week_over_week_delta_pct,
      average_weekly_volume,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
