//! Body-part volume analysis
//!
//! Per body part: volume share, opposing-pair imbalance, undertraining and a
//! zero-filled rolling weekly history.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::BodyPart;
use crate::snapshot::PerformedSet;
use crate::weekly::{aggregate_weeks, start_of_day, trailing_week_keys, week_start, zero_filled_volumes};

/// Pair difference (%) above which a pair is imbalanced
const IMBALANCE_PCT: f64 = 20.0;
/// Pair difference (%) above which an imbalance is critical
const CRITICAL_IMBALANCE_PCT: f64 = 30.0;

const UNDERTRAINED_WARNING_DAYS: i64 = 14;
const UNDERTRAINED_CRITICAL_DAYS: i64 = 30;

/// Share of total volume (%) under which a trained part gets a nudge
const LOW_SHARE_PCT: f64 = 3.0;

const MONTH_DAYS: i64 = 30;

/// ---------------------------------------------------------------------------
/// Per-Part Aggregates
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPartAggregate {
  pub body_part: BodyPart,
  pub total_volume: f64,
  /// Share of volume across all parts (0-100)
  pub percentage: f64,
  /// Distinct exercises performed
  pub exercise_count: u32,
  pub last_trained: DateTime<Utc>,
  pub days_since_trained: i64,
  /// Distinct sessions since Monday of the current week
  pub times_trained_this_week: u32,
  /// Distinct sessions in the trailing 30 days
  pub times_trained_this_month: u32,
}

#[derive(Default)]
struct PartAccumulator {
  volume: f64,
  exercises: BTreeSet<i64>,
  last_trained: Option<DateTime<Utc>>,
  week_sessions: BTreeSet<i64>,
  month_sessions: BTreeSet<i64>,
}

/// Aggregate sets per body part. Only parts with at least one set appear.
pub fn aggregate_body_parts(
  sets: &[PerformedSet],
  as_of: DateTime<Utc>,
) -> BTreeMap<BodyPart, BodyPartAggregate> {
  let week_begin = start_of_day(week_start(as_of));
  let month_begin = as_of - Duration::days(MONTH_DAYS);

  let mut parts: BTreeMap<BodyPart, PartAccumulator> = BTreeMap::new();
  for set in sets {
    let acc = parts.entry(set.body_part).or_default();
    acc.volume += set.volume();
    acc.exercises.insert(set.exercise_id);
    acc.last_trained = Some(acc.last_trained.map_or(set.performed_at, |t| t.max(set.performed_at)));
    if set.performed_at >= week_begin {
      acc.week_sessions.insert(set.session_id);
    }
    if set.performed_at >= month_begin {
      acc.month_sessions.insert(set.session_id);
    }
  }

  let total: f64 = parts.values().map(|p| p.volume).sum();

  parts
    .into_iter()
    .filter_map(|(body_part, acc)| {
      let last_trained = acc.last_trained?;
      Some((
        body_part,
        BodyPartAggregate {
          body_part,
          total_volume: acc.volume,
          percentage: if total > 0.0 { acc.volume / total * 100.0 } else { 0.0 },
          exercise_count: acc.exercises.len() as u32,
          last_trained,
          days_since_trained: (as_of.date_naive() - last_trained.date_naive()).num_days(),
          times_trained_this_week: acc.week_sessions.len() as u32,
          times_trained_this_month: acc.month_sessions.len() as u32,
        },
      ))
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Opposing Pairs
/// ---------------------------------------------------------------------------

/// Volume comparison of one opposing pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairComparison {
  pub pair: (BodyPart, BodyPart),
  pub volumes: (f64, f64),
  /// |v1 - v2| / max(v1, v2) * 100
  pub difference_pct: f64,
  pub dominant: BodyPart,
  pub weaker: BodyPart,
}

/// Compare an opposing pair. None unless both sides have volume.
pub fn compare_pair(
  volumes: &BTreeMap<BodyPart, f64>,
  first: BodyPart,
  second: BodyPart,
) -> Option<PairComparison> {
  let v1 = volumes.get(&first).copied().unwrap_or(0.0);
  let v2 = volumes.get(&second).copied().unwrap_or(0.0);
  if v1 <= 0.0 || v2 <= 0.0 {
    return None;
  }

  let max = v1.max(v2);
  let (dominant, weaker) = if v1 >= v2 { (first, second) } else { (second, first) };

  Some(PairComparison {
    pair: (first, second),
    volumes: (v1, v2),
    difference_pct: (v1 - v2).abs() / max * 100.0,
    dominant,
    weaker,
  })
}

/// Compare every opposing pair with volume on both sides
pub fn compare_opposing_pairs(volumes: &BTreeMap<BodyPart, f64>) -> Vec<PairComparison> {
  BodyPart::OPPOSING_PAIRS
    .iter()
    .filter_map(|(a, b)| compare_pair(volumes, *a, *b))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleImbalance {
  #[serde(flatten)]
  pub comparison: PairComparison,
  pub is_imbalanced: bool,
  pub is_critical: bool,
  pub recommendation: String,
}

impl MuscleImbalance {
  pub fn from_comparison(comparison: PairComparison) -> Self {
    let pct = comparison.difference_pct;
    let is_imbalanced = pct > IMBALANCE_PCT;
    let is_critical = pct > CRITICAL_IMBALANCE_PCT;

    let recommendation = if is_critical {
      format!(
        "Critical imbalance: {} volume is {:.0}% below {}. Prioritise {} work until the gap closes.",
        comparison.weaker, pct, comparison.dominant, comparison.weaker
      )
    } else if is_imbalanced {
      format!(
        "{} volume is {:.0}% below {}. Add a set or two of {} work each week.",
        comparison.weaker, pct, comparison.dominant, comparison.weaker
      )
    } else {
      format!("{} and {} are balanced.", comparison.pair.0, comparison.pair.1)
    };

    Self {
      comparison,
      is_imbalanced,
      is_critical,
      recommendation,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Undertraining
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndertrainingSeverity {
  Warning,
  Critical,
}

impl UndertrainingSeverity {
  /// Severity for a part last trained `days` ago, if any
  pub fn from_days(days: i64) -> Option<Self> {
    match days {
      d if d >= UNDERTRAINED_CRITICAL_DAYS => Some(Self::Critical),
      d if d >= UNDERTRAINED_WARNING_DAYS => Some(Self::Warning),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndertrainedBodyPart {
  pub body_part: BodyPart,
  pub last_trained: DateTime<Utc>,
  pub days_since_trained: i64,
  pub severity: UndertrainingSeverity,
}

/// ---------------------------------------------------------------------------
/// Rolling History
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyVolumePoint {
  pub week_start: NaiveDate,
  pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPartHistory {
  pub body_part: BodyPart,
  /// Exactly one entry per week of the window, oldest first
  pub weeks: Vec<WeeklyVolumePoint>,
}

/// Zero-filled weekly volume per body part over the trailing `weeks` weeks.
/// Only parts with a set inside the window are included.
pub fn rolling_history(
  sets: &[PerformedSet],
  as_of: DateTime<Utc>,
  weeks: u32,
) -> Vec<BodyPartHistory> {
  let keys = trailing_week_keys(as_of, weeks);
  let Some(first) = keys.first() else {
    return Vec::new();
  };
  let window_start = start_of_day(*first);

  let mut by_part: BTreeMap<BodyPart, Vec<PerformedSet>> = BTreeMap::new();
  for set in sets
    .iter()
    .filter(|s| s.performed_at >= window_start && s.performed_at <= as_of)
  {
    by_part.entry(set.body_part).or_default().push(set.clone());
  }

  by_part
    .into_iter()
    .map(|(body_part, part_sets)| {
      let volumes = zero_filled_volumes(&aggregate_weeks(&part_sets), &keys);
      BodyPartHistory {
        body_part,
        weeks: keys
          .iter()
          .zip(volumes)
          .map(|(week_start, volume)| WeeklyVolumePoint {
            week_start: *week_start,
            volume,
          })
          .collect(),
      }
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Body-Part Analysis
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPartAnalysis {
  pub total_volume: f64,
  /// Sorted by volume, highest first
  pub distribution: Vec<BodyPartAggregate>,
  pub imbalances: Vec<MuscleImbalance>,
  pub undertrained: Vec<UndertrainedBodyPart>,
  pub recommendations: Vec<String>,
  pub history: Vec<BodyPartHistory>,
}

impl BodyPartAnalysis {
  /// `sets` is the all-time log; history covers the trailing `history_weeks`.
  pub fn compute(sets: &[PerformedSet], as_of: DateTime<Utc>, history_weeks: u32) -> Self {
    let aggregates = aggregate_body_parts(sets, as_of);
    Self::from_aggregates(&aggregates, sets, as_of, history_weeks)
  }

  pub fn from_aggregates(
    aggregates: &BTreeMap<BodyPart, BodyPartAggregate>,
    sets: &[PerformedSet],
    as_of: DateTime<Utc>,
    history_weeks: u32,
  ) -> Self {
    let total_volume: f64 = aggregates.values().map(|a| a.total_volume).sum();

    let mut distribution: Vec<BodyPartAggregate> = aggregates.values().cloned().collect();
    // BTreeMap order is the tie-breaker; the sort is stable
    distribution.sort_by(|a, b| b.total_volume.total_cmp(&a.total_volume));

    let volumes: BTreeMap<BodyPart, f64> = aggregates
      .iter()
      .map(|(part, agg)| (*part, agg.total_volume))
      .collect();
    let imbalances: Vec<MuscleImbalance> = compare_opposing_pairs(&volumes)
      .into_iter()
      .map(MuscleImbalance::from_comparison)
      .collect();

    let undertrained: Vec<UndertrainedBodyPart> = aggregates
      .values()
      .filter(|agg| agg.total_volume > 0.0)
      .filter_map(|agg| {
        UndertrainingSeverity::from_days(agg.days_since_trained).map(|severity| {
          UndertrainedBodyPart {
            body_part: agg.body_part,
            last_trained: agg.last_trained,
            days_since_trained: agg.days_since_trained,
            severity,
          }
        })
      })
      .collect();

    let history = rolling_history(sets, as_of, history_weeks);
    let recommendations =
      Self::build_recommendations(&distribution, &imbalances, &undertrained);

    debug!(
      parts = distribution.len(),
      imbalanced = imbalances.iter().filter(|i| i.is_imbalanced).count(),
      undertrained = undertrained.len(),
      "analyzed body parts"
    );

    Self {
      total_volume,
      distribution,
      imbalances,
      undertrained,
      recommendations,
      history,
    }
  }

  fn build_recommendations(
    distribution: &[BodyPartAggregate],
    imbalances: &[MuscleImbalance],
    undertrained: &[UndertrainedBodyPart],
  ) -> Vec<String> {
    let mut recommendations = Vec::new();
    if distribution.is_empty() {
      return recommendations;
    }

    recommendations.extend(
      imbalances
        .iter()
        .filter(|i| i.is_critical)
        .map(|i| i.recommendation.clone()),
    );

    recommendations.extend(
      undertrained
        .iter()
        .filter(|u| u.severity == UndertrainingSeverity::Critical)
        .map(|u| {
          format!(
            "{} hasn't been trained in {} days. Bring it back into your program this week.",
            u.body_part, u.days_since_trained
          )
        }),
    );

    recommendations.extend(
      distribution
        .iter()
        .filter(|a| a.total_volume > 0.0 && a.percentage < LOW_SHARE_PCT)
        .map(|a| {
          format!(
            "{} is only {:.1}% of your total volume. Consider adding more {} work.",
            a.body_part, a.percentage, a.body_part
          )
        }),
    );

    if !imbalances.iter().any(|i| i.is_imbalanced) {
      recommendations.push("Opposing muscle groups are well balanced. Keep it up.".to_string());
    }
    if undertrained.is_empty() {
      recommendations.push(
        "Every body part you train has been worked in the last two weeks. Great consistency."
          .to_string(),
      );
    }

    recommendations
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::test_utils::{days_before, mock_set, utc};

  fn volumes(entries: &[(BodyPart, f64)]) -> BTreeMap<BodyPart, f64> {
    entries.iter().copied().collect()
  }

  #[test]
  fn test_imbalance_flagged_but_not_critical() {
    let comparison =
      compare_pair(&volumes(&[(BodyPart::Chest, 1000.0), (BodyPart::Back, 1300.0)]), BodyPart::Chest, BodyPart::Back)
        .unwrap();
    assert_approx_eq!(comparison.difference_pct, 23.0769, 0.001);
    assert_eq!(comparison.dominant, BodyPart::Back);

    let imbalance = MuscleImbalance::from_comparison(comparison);
    assert!(imbalance.is_imbalanced);
    assert!(!imbalance.is_critical);
  }

  #[test]
  fn test_critical_imbalance() {
    let comparison = compare_pair(
      &volumes(&[(BodyPart::Quads, 2000.0), (BodyPart::Hamstrings, 1000.0)]),
      BodyPart::Quads,
      BodyPart::Hamstrings,
    )
    .unwrap();
    let imbalance = MuscleImbalance::from_comparison(comparison);
    assert!(imbalance.is_critical);
    assert!(imbalance.recommendation.starts_with("Critical imbalance: hamstrings"));
  }

  #[test]
  fn test_pair_requires_volume_on_both_sides() {
    let v = volumes(&[(BodyPart::Biceps, 500.0)]);
    assert!(compare_pair(&v, BodyPart::Biceps, BodyPart::Triceps).is_none());
    assert!(compare_opposing_pairs(&v).is_empty());
  }

  #[test]
  fn test_undertraining_thresholds() {
    assert_eq!(UndertrainingSeverity::from_days(31), Some(UndertrainingSeverity::Critical));
    assert_eq!(UndertrainingSeverity::from_days(30), Some(UndertrainingSeverity::Critical));
    assert_eq!(UndertrainingSeverity::from_days(15), Some(UndertrainingSeverity::Warning));
    assert_eq!(UndertrainingSeverity::from_days(10), None);
  }

  #[test]
  fn test_undertrained_parts_from_log() {
    let as_of = utc(2024, 6, 28, 18);
    let sets = vec![
      mock_set(1, BodyPart::Calves, 15, 40.0, days_before(as_of, 31)),
      mock_set(2, BodyPart::Glutes, 10, 80.0, days_before(as_of, 15)),
      mock_set(3, BodyPart::Chest, 10, 60.0, days_before(as_of, 10)),
    ];

    let analysis = BodyPartAnalysis::compute(&sets, as_of, 12);
    let flagged: Vec<(BodyPart, UndertrainingSeverity)> = analysis
      .undertrained
      .iter()
      .map(|u| (u.body_part, u.severity))
      .collect();

    assert_eq!(
      flagged,
      vec![
        (BodyPart::Glutes, UndertrainingSeverity::Warning),
        (BodyPart::Calves, UndertrainingSeverity::Critical),
      ]
    );
    assert!(analysis
      .recommendations
      .iter()
      .any(|r| r.starts_with("calves hasn't been trained in 31 days")));
  }

  #[test]
  fn test_distribution_sorted_and_sums_to_100() {
    let as_of = utc(2024, 6, 28, 18);
    let sets = vec![
      mock_set(1, BodyPart::Chest, 10, 50.0, days_before(as_of, 1)),
      mock_set(1, BodyPart::Back, 10, 100.0, days_before(as_of, 1)),
      mock_set(1, BodyPart::Shoulders, 10, 25.0, days_before(as_of, 1)),
    ];

    let analysis = BodyPartAnalysis::compute(&sets, as_of, 12);
    let order: Vec<BodyPart> = analysis.distribution.iter().map(|a| a.body_part).collect();
    assert_eq!(order, vec![BodyPart::Back, BodyPart::Chest, BodyPart::Shoulders]);

    let total_pct: f64 = analysis.distribution.iter().map(|a| a.percentage).sum();
    assert_approx_eq!(total_pct, 100.0, 1e-9);
    assert_eq!(analysis.total_volume, 1750.0);
  }

  #[test]
  fn test_low_share_recommendation() {
    let as_of = utc(2024, 6, 28, 18);
    let sets = vec![
      mock_set(1, BodyPart::Quads, 10, 200.0, days_before(as_of, 1)),
      mock_set(1, BodyPart::Forearms, 10, 5.0, days_before(as_of, 1)),
    ];
    let analysis = BodyPartAnalysis::compute(&sets, as_of, 12);
    assert!(analysis
      .recommendations
      .iter()
      .any(|r| r.starts_with("forearms is only 2.4% of your total volume")));
  }

  #[test]
  fn test_positive_messages_when_balanced() {
    let as_of = utc(2024, 6, 28, 18);
    let sets = vec![
      mock_set(1, BodyPart::Chest, 10, 100.0, days_before(as_of, 2)),
      mock_set(1, BodyPart::Back, 10, 105.0, days_before(as_of, 2)),
    ];
    let analysis = BodyPartAnalysis::compute(&sets, as_of, 12);
    assert_eq!(analysis.recommendations.len(), 2);
    assert!(analysis.recommendations[0].contains("well balanced"));
  }

  #[test]
  fn test_history_is_zero_filled_to_twelve_weeks() {
    // Friday; the window's first Monday is 2024-04-08
    let as_of = utc(2024, 6, 28, 18);
    let sets = vec![
      mock_set(1, BodyPart::Back, 10, 100.0, utc(2024, 4, 9, 8)),
      mock_set(2, BodyPart::Back, 10, 120.0, utc(2024, 6, 25, 8)),
      // Outside the window
      mock_set(3, BodyPart::Chest, 10, 100.0, utc(2024, 3, 1, 8)),
    ];

    let history = rolling_history(&sets, as_of, 12);
    assert_eq!(history.len(), 1);

    let back = &history[0];
    assert_eq!(back.body_part, BodyPart::Back);
    assert_eq!(back.weeks.len(), 12);
    assert_eq!(back.weeks[0].week_start, NaiveDate::from_ymd_opt(2024, 4, 8).unwrap());
    assert_eq!(back.weeks[0].volume, 1000.0);
    assert_eq!(back.weeks[11].volume, 1200.0);
    assert!(back.weeks[1..11].iter().all(|w| w.volume == 0.0));
    assert!(back.weeks.windows(2).all(|w| w[0].week_start < w[1].week_start));
  }

  #[test]
  fn test_times_trained_counts_distinct_sessions() {
    // Friday 2024-06-28; week began Monday 2024-06-24
    let as_of = utc(2024, 6, 28, 18);
    let sets = vec![
      mock_set(1, BodyPart::Quads, 5, 100.0, utc(2024, 6, 25, 8)),
      mock_set(1, BodyPart::Quads, 8, 100.0, utc(2024, 6, 25, 8)),
      mock_set(2, BodyPart::Quads, 5, 100.0, utc(2024, 6, 20, 8)),
      mock_set(3, BodyPart::Quads, 5, 100.0, utc(2024, 5, 1, 8)),
    ];
    let aggregates = aggregate_body_parts(&sets, as_of);
    let quads = &aggregates[&BodyPart::Quads];

    assert_eq!(quads.times_trained_this_week, 1);
    assert_eq!(quads.times_trained_this_month, 2);
    assert_eq!(quads.exercise_count, 1);
    assert_eq!(quads.days_since_trained, 3);
  }

  #[test]
  fn test_days_since_trained_counts_calendar_days() {
    let as_of = utc(2024, 6, 28, 9);
    // Fourteen dates back, but later in the day than as_of
    let sets = vec![mock_set(1, BodyPart::Calves, 15, 40.0, utc(2024, 6, 14, 20))];

    let aggregates = aggregate_body_parts(&sets, as_of);
    assert_eq!(aggregates[&BodyPart::Calves].days_since_trained, 14);

    let analysis = BodyPartAnalysis::compute(&sets, as_of, 12);
    assert_eq!(analysis.undertrained.len(), 1);
    assert_eq!(analysis.undertrained[0].severity, UndertrainingSeverity::Warning);
  }

  #[test]
  fn test_no_activity_yields_empty_analysis() {
    let analysis = BodyPartAnalysis::compute(&[], utc(2024, 6, 28, 18), 12);
    assert!(analysis.distribution.is_empty());
    assert!(analysis.imbalances.is_empty());
    assert!(analysis.undertrained.is_empty());
    assert!(analysis.recommendations.is_empty());
    assert!(analysis.history.is_empty());
  }
}
