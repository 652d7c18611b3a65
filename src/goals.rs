//! Goal progress evaluation

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::aggregates::{normalize_exercise_name, TrainingAggregates};
use crate::models::{Goal, GoalTarget, GoalType, Timeframe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
  pub goal_id: i64,
  pub name: String,
  pub goal_type: GoalType,
  pub timeframe: Timeframe,
  pub current_value: f64,
  pub target_value: f64,
  /// min(current / target, 1) * 100
  pub progress_pct: f64,
  pub achieved: bool,
  /// Named exercises not yet performed in the timeframe
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub missing_exercises: Vec<String>,
}

fn progress_pct(current: f64, target: f64) -> f64 {
  if target <= 0.0 {
    100.0
  } else {
    (current / target).min(1.0) * 100.0
  }
}

/// Evaluate one goal against the trailing-window totals for its timeframe
pub fn evaluate_goal(goal: &Goal, aggregates: &TrainingAggregates) -> GoalProgress {
  let totals = aggregates.totals(goal.timeframe);

  let (current_value, target_value, achieved, missing_exercises) = match &goal.target {
    GoalTarget::Volume { target, body_part } => {
      let current = match body_part {
        Some(part) => totals.body_part_volumes.get(part).copied().unwrap_or(0.0),
        None => totals.total_volume,
      };
      (current, *target, current >= *target, Vec::new())
    }
    GoalTarget::Frequency { sessions } => {
      let current = totals.completed_sessions as f64;
      let target = *sessions as f64;
      (current, target, current >= target, Vec::new())
    }
    GoalTarget::SpecificExercises { exercises } => {
      // First spelling of each distinct name
      let mut seen = BTreeSet::new();
      let wanted: Vec<(&String, String)> = exercises
        .iter()
        .map(|name| (name, normalize_exercise_name(name)))
        .filter(|(_, key)| seen.insert(key.clone()))
        .collect();

      let missing: Vec<String> = wanted
        .iter()
        .filter(|(_, key)| !totals.exercises_performed.contains(key))
        .map(|(name, _)| name.to_string())
        .collect();
      let performed = (wanted.len() - missing.len()) as f64;
      (performed, wanted.len() as f64, missing.is_empty(), missing)
    }
  };

  GoalProgress {
    goal_id: goal.id,
    name: goal.name.clone(),
    goal_type: goal.goal_type(),
    timeframe: goal.timeframe,
    current_value,
    target_value,
    progress_pct: progress_pct(current_value, target_value),
    achieved: achieved || target_value <= 0.0,
    missing_exercises,
  }
}

pub fn evaluate_goals(goals: &[Goal], aggregates: &TrainingAggregates) -> Vec<GoalProgress> {
  goals.iter().map(|g| evaluate_goal(g, aggregates)).collect()
}
