//! Left/right symmetry of unilateral exercises

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{BodyPart, Side};
use crate::snapshot::PerformedSet;

/// ---------------------------------------------------------------------------
/// Thresholds
/// ---------------------------------------------------------------------------

/// Imbalance boundaries (%) between the low, moderate and high tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetryThresholds {
  /// At or above: moderate
  pub moderate_pct: f64,
  /// At or above: high
  pub high_pct: f64,
}

impl Default for SymmetryThresholds {
  fn default() -> Self {
    Self {
      moderate_pct: 15.0,
      high_pct: 20.0,
    }
  }
}

impl SymmetryThresholds {
  pub fn tier(&self, imbalance_pct: f64) -> SymmetryRisk {
    if imbalance_pct >= self.high_pct {
      SymmetryRisk::High
    } else if imbalance_pct >= self.moderate_pct {
      SymmetryRisk::Moderate
    } else {
      SymmetryRisk::Low
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymmetryRisk {
  Low,
  Moderate,
  High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrongerSide {
  Left,
  Right,
  Balanced,
}

impl fmt::Display for StrongerSide {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      StrongerSide::Left => write!(f, "left"),
      StrongerSide::Right => write!(f, "right"),
      StrongerSide::Balanced => write!(f, "balanced"),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Per-Exercise Metrics
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
  pub set_count: u32,
  pub average_weight: f64,
  pub average_reps: f64,
  pub volume: f64,
}

impl SideStats {
  fn from_sets<'a>(sets: impl Iterator<Item = &'a PerformedSet>) -> Self {
    let (mut count, mut weight, mut reps, mut volume) = (0u32, 0.0, 0.0, 0.0);
    for set in sets {
      count += 1;
      weight += set.weight;
      reps += set.reps as f64;
      volume += set.volume();
    }
    if count == 0 {
      return Self::default();
    }
    Self {
      set_count: count,
      average_weight: weight / count as f64,
      average_reps: reps / count as f64,
      volume,
    }
  }
}

/// Imbalance (%) between two side volumes and the side carrying more.
/// One side at zero gives 100% toward the other; both at zero is balanced.
pub fn side_imbalance(left_volume: f64, right_volume: f64) -> (f64, StrongerSide) {
  let max = left_volume.max(right_volume);
  if max <= 0.0 {
    return (0.0, StrongerSide::Balanced);
  }
  let pct = (left_volume - right_volume).abs() / max * 100.0;
  let stronger = if left_volume > right_volume {
    StrongerSide::Left
  } else if right_volume > left_volume {
    StrongerSide::Right
  } else {
    StrongerSide::Balanced
  };
  (pct, stronger)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetryMetric {
  pub exercise_id: i64,
  pub exercise_name: String,
  pub body_part: BodyPart,
  pub left: SideStats,
  pub right: SideStats,
  pub imbalance_pct: f64,
  pub stronger_side: StrongerSide,
  pub risk: SymmetryRisk,
  pub recommendation: Option<String>,
}

impl SymmetryMetric {
  fn compute(sets: &[&PerformedSet], thresholds: &SymmetryThresholds) -> Option<Self> {
    let first = sets.first()?;
    let left = SideStats::from_sets(sets.iter().copied().filter(|s| s.side == Side::Left));
    let right = SideStats::from_sets(sets.iter().copied().filter(|s| s.side == Side::Right));
    let (imbalance_pct, stronger_side) = side_imbalance(left.volume, right.volume);
    let risk = thresholds.tier(imbalance_pct);

    let recommendation = match (risk, stronger_side) {
      (SymmetryRisk::Low, _) | (_, StrongerSide::Balanced) => None,
      (risk, stronger) => {
        let weaker = match stronger {
          StrongerSide::Left => "right",
          _ => "left",
        };
        Some(match risk {
          SymmetryRisk::High => format!(
            "{}: your {} side does {:.0}% more volume. Start each set on your {} side and add an extra {} set until they match.",
            first.exercise_name, stronger, imbalance_pct, weaker, weaker
          ),
          _ => format!(
            "{}: your {} side does {:.0}% more volume. Lead with your {} side and match its reps on the {} side.",
            first.exercise_name, stronger, imbalance_pct, weaker, stronger
          ),
        })
      }
    };

    Some(Self {
      exercise_id: first.exercise_id,
      exercise_name: first.exercise_name.clone(),
      body_part: first.body_part,
      left,
      right,
      imbalance_pct,
      stronger_side,
      risk,
      recommendation,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Summary / Analysis
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorstImbalance {
  pub exercise_name: String,
  pub imbalance_pct: f64,
  pub stronger_side: StrongerSide,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymmetrySummary {
  pub exercises_tracked: u32,
  /// Exercises at or above the moderate threshold
  pub exercises_imbalanced: u32,
  pub average_imbalance_pct: f64,
  pub worst: Option<WorstImbalance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetryAnalysis {
  /// One entry per unilateral exercise, ordered by exercise name
  pub metrics: Vec<SymmetryMetric>,
  pub summary: SymmetrySummary,
  pub recommendations: Vec<String>,
  pub thresholds: SymmetryThresholds,
}

impl SymmetryAnalysis {
  pub fn compute(sets: &[PerformedSet], thresholds: SymmetryThresholds) -> Self {
    let mut by_exercise: BTreeMap<i64, Vec<&PerformedSet>> = BTreeMap::new();
    for set in sets
      .iter()
      .filter(|s| s.is_unilateral && s.side != Side::Unsided)
    {
      by_exercise.entry(set.exercise_id).or_default().push(set);
    }

    let mut metrics: Vec<SymmetryMetric> = by_exercise
      .values()
      .filter_map(|exercise_sets| SymmetryMetric::compute(exercise_sets, &thresholds))
      .collect();
    metrics.sort_by(|a, b| {
      a.exercise_name
        .cmp(&b.exercise_name)
        .then(a.exercise_id.cmp(&b.exercise_id))
    });

    let summary = Self::summarize(&metrics, &thresholds);

    let mut recommendations: Vec<String> = metrics
      .iter()
      .filter_map(|m| m.recommendation.clone())
      .collect();
    if !metrics.is_empty() && recommendations.is_empty() {
      recommendations.push("Left/right balance looks good across your unilateral exercises.".to_string());
    }

    debug!(
      tracked = summary.exercises_tracked,
      imbalanced = summary.exercises_imbalanced,
      "analyzed symmetry"
    );

    Self {
      metrics,
      summary,
      recommendations,
      thresholds,
    }
  }

  fn summarize(metrics: &[SymmetryMetric], thresholds: &SymmetryThresholds) -> SymmetrySummary {
    if metrics.is_empty() {
      return SymmetrySummary::default();
    }

    // First by name wins ties
    let worst = metrics
      .iter()
      .fold(None::<&SymmetryMetric>, |worst, m| match worst {
        Some(w) if w.imbalance_pct >= m.imbalance_pct => Some(w),
        _ => Some(m),
      })
      .map(|m| WorstImbalance {
        exercise_name: m.exercise_name.clone(),
        imbalance_pct: m.imbalance_pct,
        stronger_side: m.stronger_side,
      });

    SymmetrySummary {
      exercises_tracked: metrics.len() as u32,
      exercises_imbalanced: metrics
        .iter()
        .filter(|m| m.imbalance_pct >= thresholds.moderate_pct)
        .count() as u32,
      average_imbalance_pct: metrics.iter().map(|m| m.imbalance_pct).sum::<f64>()
        / metrics.len() as f64,
      worst,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::test_utils::{mock_set, mock_unilateral_set, utc};

  fn at() -> chrono::DateTime<chrono::Utc> {
    utc(2024, 6, 25, 8)
  }

  #[test]
  fn test_one_sided_volume_is_full_imbalance() {
    let sets = vec![mock_unilateral_set("Bulgarian Split Squat", Side::Left, 10, 50.0, at())];
    let analysis = SymmetryAnalysis::compute(&sets, SymmetryThresholds::default());

    let metric = &analysis.metrics[0];
    assert_eq!(metric.left.volume, 500.0);
    assert_eq!(metric.right.set_count, 0);
    assert_eq!(metric.imbalance_pct, 100.0);
    assert_eq!(metric.stronger_side, StrongerSide::Left);
    assert_eq!(metric.risk, SymmetryRisk::High);
  }

  #[test]
  fn test_zero_volume_on_both_sides_is_balanced() {
    assert_eq!(side_imbalance(0.0, 0.0), (0.0, StrongerSide::Balanced));
  }

  #[test]
  fn test_side_averages() {
    let sets = vec![
      mock_unilateral_set("Single Leg Press", Side::Left, 10, 40.0, at()),
      mock_unilateral_set("Single Leg Press", Side::Left, 8, 50.0, at()),
      mock_unilateral_set("Single Leg Press", Side::Right, 10, 45.0, at()),
    ];
    let analysis = SymmetryAnalysis::compute(&sets, SymmetryThresholds::default());
    let metric = &analysis.metrics[0];

    assert_eq!(metric.left.set_count, 2);
    assert_approx_eq!(metric.left.average_weight, 45.0, 1e-9);
    assert_approx_eq!(metric.left.average_reps, 9.0, 1e-9);
    assert_eq!(metric.left.volume, 800.0);
    // |800 - 450| / 800
    assert_approx_eq!(metric.imbalance_pct, 43.75, 1e-9);
  }

  #[test]
  fn test_tiers_follow_thresholds() {
    let defaults = SymmetryThresholds::default();
    assert_eq!(defaults.tier(14.9), SymmetryRisk::Low);
    assert_eq!(defaults.tier(15.0), SymmetryRisk::Moderate);
    assert_eq!(defaults.tier(19.9), SymmetryRisk::Moderate);
    assert_eq!(defaults.tier(20.0), SymmetryRisk::High);

    let strict = SymmetryThresholds {
      moderate_pct: 10.0,
      high_pct: 12.0,
    };
    assert_eq!(strict.tier(11.0), SymmetryRisk::Moderate);
  }

  #[test]
  fn test_recommendation_names_stronger_side() {
    // Right 1000, left 840 => 16%
    let sets = vec![
      mock_unilateral_set("Single Arm Row", Side::Right, 10, 100.0, at()),
      mock_unilateral_set("Single Arm Row", Side::Left, 10, 84.0, at()),
    ];
    let analysis = SymmetryAnalysis::compute(&sets, SymmetryThresholds::default());
    let metric = &analysis.metrics[0];

    assert_eq!(metric.risk, SymmetryRisk::Moderate);
    assert_eq!(
      metric.recommendation.as_deref(),
      Some("Single Arm Row: your right side does 16% more volume. Lead with your left side and match its reps on the right side.")
    );
  }

  #[test]
  fn test_summary_counts_and_worst() {
    let mut lunge_left = mock_unilateral_set("Lunge", Side::Left, 10, 50.0, at());
    lunge_left.exercise_id = 1;
    let mut lunge_right = mock_unilateral_set("Lunge", Side::Right, 10, 50.0, at());
    lunge_right.exercise_id = 1;
    let mut curl_left = mock_unilateral_set("Concentration Curl", Side::Left, 10, 10.0, at());
    curl_left.exercise_id = 2;
    let mut curl_right = mock_unilateral_set("Concentration Curl", Side::Right, 10, 12.0, at());
    curl_right.exercise_id = 2;

    let analysis = SymmetryAnalysis::compute(
      &[lunge_left, lunge_right, curl_left, curl_right],
      SymmetryThresholds::default(),
    );

    let names: Vec<&str> = analysis.metrics.iter().map(|m| m.exercise_name.as_str()).collect();
    assert_eq!(names, vec!["Concentration Curl", "Lunge"]);

    let summary = &analysis.summary;
    assert_eq!(summary.exercises_tracked, 2);
    assert_eq!(summary.exercises_imbalanced, 1);
    // (16.67 + 0) / 2
    assert_approx_eq!(summary.average_imbalance_pct, 100.0 / 12.0, 1e-9);
    let worst = summary.worst.as_ref().unwrap();
    assert_eq!(worst.exercise_name, "Concentration Curl");
    assert_eq!(worst.stronger_side, StrongerSide::Right);
  }

  #[test]
  fn test_bilateral_sets_ignored() {
    let sets = vec![mock_set(1, BodyPart::Quads, 5, 100.0, at())];
    let analysis = SymmetryAnalysis::compute(&sets, SymmetryThresholds::default());
    assert!(analysis.metrics.is_empty());
    assert_eq!(analysis.summary, SymmetrySummary::default());
    assert!(analysis.recommendations.is_empty());
  }

  #[test]
  fn test_balanced_exercises_get_positive_message() {
    let sets = vec![
      mock_unilateral_set("Step Up", Side::Left, 10, 30.0, at()),
      mock_unilateral_set("Step Up", Side::Right, 10, 30.0, at()),
    ];
    let analysis = SymmetryAnalysis::compute(&sets, SymmetryThresholds::default());
    assert_eq!(analysis.metrics[0].stronger_side, StrongerSide::Balanced);
    assert_eq!(analysis.recommendations.len(), 1);
  }
}
