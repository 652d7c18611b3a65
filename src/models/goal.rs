use serde::{Deserialize, Serialize};

use super::workout::BodyPart;
use crate::error::AnalyticsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
  Volume,
  Frequency,
  SpecificExercises,
}

impl std::str::FromStr for GoalType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "volume" => Ok(Self::Volume),
      "frequency" => Ok(Self::Frequency),
      "specific_exercises" => Ok(Self::SpecificExercises),
      _ => Err(format!("Unknown goal type: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
  Weekly,
  Monthly,
}

impl Timeframe {
  /// Length of the trailing window evaluated for this timeframe
  pub fn days(&self) -> i64 {
    match self {
      Timeframe::Weekly => 7,
      Timeframe::Monthly => 30,
    }
  }
}

impl std::str::FromStr for Timeframe {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "weekly" => Ok(Self::Weekly),
      "monthly" => Ok(Self::Monthly),
      _ => Err(format!("Unknown timeframe: {}", s)),
    }
  }
}

/// What a goal measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalTarget {
  /// Total volume, optionally restricted to one body part
  Volume {
    target: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    body_part: Option<BodyPart>,
  },
  /// Completed sessions
  Frequency { sessions: u32 },
  /// Every named exercise performed at least once
  SpecificExercises { exercises: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
  pub id: i64,
  pub user_id: i64,
  pub name: String,
  pub target: GoalTarget,
  pub timeframe: Timeframe,
}

impl Goal {
  pub fn goal_type(&self) -> GoalType {
    match self.target {
      GoalTarget::Volume { .. } => GoalType::Volume,
      GoalTarget::Frequency { .. } => GoalType::Frequency,
      GoalTarget::SpecificExercises { .. } => GoalType::SpecificExercises,
    }
  }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GoalRow {
  pub id: i64,
  pub user_id: i64,
  pub name: String,
  pub goal_type: String,
  pub timeframe: String,
  pub target_value: Option<f64>,
  pub body_part: Option<String>,
  pub exercises_json: Option<String>,
}

impl TryFrom<GoalRow> for Goal {
  type Error = AnalyticsError;

  fn try_from(row: GoalRow) -> Result<Self, Self::Error> {
    let bad = |msg: String| AnalyticsError::SourceRead(format!("goal {}: {}", row.id, msg));

    let goal_type: GoalType = row.goal_type.parse().map_err(bad)?;
    let timeframe: Timeframe = row.timeframe.parse().map_err(bad)?;

    let target = match goal_type {
      GoalType::Volume => GoalTarget::Volume {
        target: row.target_value.unwrap_or(0.0),
        body_part: row
          .body_part
          .as_deref()
          .map(str::parse::<BodyPart>)
          .transpose()
          .map_err(bad)?,
      },
      GoalType::Frequency => GoalTarget::Frequency {
        sessions: row.target_value.unwrap_or(0.0).max(0.0).round() as u32,
      },
      GoalType::SpecificExercises => {
        let exercises = match row.exercises_json.as_deref() {
          Some(json) => serde_json::from_str::<Vec<String>>(json)
            .map_err(|e| bad(format!("invalid exercise list: {}", e)))?,
          None => Vec::new(),
        };
        GoalTarget::SpecificExercises { exercises }
      }
    };

    Ok(Self {
      id: row.id,
      user_id: row.user_id,
      name: row.name,
      target,
      timeframe,
    })
  }
}
