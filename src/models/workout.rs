use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// ---------------------------------------------------------------------------
/// Body Parts
/// ---------------------------------------------------------------------------

/// Target body part of an exercise. Closed set; stored as snake_case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
  Chest,
  Back,
  Shoulders,
  Biceps,
  Triceps,
  Forearms,
  Core,
  Quads,
  Hamstrings,
  Glutes,
  Calves,
  Adductors,
  Abductors,
  Neck,
}

impl BodyPart {
  pub const ALL: [BodyPart; 14] = [
    BodyPart::Chest,
    BodyPart::Back,
    BodyPart::Shoulders,
    BodyPart::Biceps,
    BodyPart::Triceps,
    BodyPart::Forearms,
    BodyPart::Core,
    BodyPart::Quads,
    BodyPart::Hamstrings,
    BodyPart::Glutes,
    BodyPart::Calves,
    BodyPart::Adductors,
    BodyPart::Abductors,
    BodyPart::Neck,
  ];

  /// Opposing pairs checked for imbalance
  pub const OPPOSING_PAIRS: [(BodyPart, BodyPart); 4] = [
    (BodyPart::Chest, BodyPart::Back),
    (BodyPart::Quads, BodyPart::Hamstrings),
    (BodyPart::Biceps, BodyPart::Triceps),
    (BodyPart::Abductors, BodyPart::Adductors),
  ];

  pub const STABILIZERS: [BodyPart; 6] = [
    BodyPart::Core,
    BodyPart::Forearms,
    BodyPart::Calves,
    BodyPart::Neck,
    BodyPart::Adductors,
    BodyPart::Abductors,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      BodyPart::Chest => "chest",
      BodyPart::Back => "back",
      BodyPart::Shoulders => "shoulders",
      BodyPart::Biceps => "biceps",
      BodyPart::Triceps => "triceps",
      BodyPart::Forearms => "forearms",
      BodyPart::Core => "core",
      BodyPart::Quads => "quads",
      BodyPart::Hamstrings => "hamstrings",
      BodyPart::Glutes => "glutes",
      BodyPart::Calves => "calves",
      BodyPart::Adductors => "adductors",
      BodyPart::Abductors => "abductors",
      BodyPart::Neck => "neck",
    }
  }

  pub fn is_stabilizer(&self) -> bool {
    Self::STABILIZERS.contains(self)
  }
}

impl std::fmt::Display for BodyPart {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for BodyPart {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    BodyPart::ALL
      .iter()
      .copied()
      .find(|part| part.as_str() == s)
      .ok_or_else(|| format!("Unknown body part: {}", s))
  }
}

/// ---------------------------------------------------------------------------
/// Side Tag
/// ---------------------------------------------------------------------------

/// Body side a set was performed with. Only unilateral exercises carry
/// `Left`/`Right`; everything else is `Unsided` (stored as `none`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
  Left,
  Right,
  #[default]
  #[serde(rename = "none")]
  Unsided,
}

impl std::fmt::Display for Side {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Left => write!(f, "left"),
      Self::Right => write!(f, "right"),
      Self::Unsided => write!(f, "none"),
    }
  }
}

impl std::str::FromStr for Side {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "left" => Ok(Self::Left),
      "right" => Ok(Self::Right),
      "none" | "" => Ok(Self::Unsided),
      _ => Err(format!("Unknown side: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Raw Log Entities
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
  pub id: i64,
  pub user_id: i64,
  pub started_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
  pub fn is_completed(&self) -> bool {
    self.completed_at.is_some()
  }
}

/// Exercise definition as referenced by an exercise instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
  pub id: i64,
  pub name: String,
  pub body_part: BodyPart,
  pub muscle_group: Option<String>,
  pub is_unilateral: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseInstance {
  pub id: i64,
  pub session_id: i64,
  pub exercise: Exercise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
  pub id: i64,
  pub exercise_instance_id: i64,
  pub reps: u32,
  pub weight: f64,
  /// Reps in reserve; stored but not used by any derived metric
  pub rir: Option<i64>,
  pub completed: bool,
  pub side: Side,
  pub created_at: DateTime<Utc>,
}

impl SetRecord {
  pub fn volume(&self) -> f64 {
    self.reps as f64 * self.weight
  }
}

/// ---------------------------------------------------------------------------
/// Store Rows
/// ---------------------------------------------------------------------------

/// Exercise instance joined to its exercise definition
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExerciseInstanceRow {
  pub id: i64,
  pub session_id: i64,
  pub exercise_id: i64,
  pub name: String,
  pub body_part: String,
  pub muscle_group: Option<String>,
  pub is_unilateral: bool,
}

impl TryFrom<ExerciseInstanceRow> for ExerciseInstance {
  type Error = AnalyticsError;

  fn try_from(row: ExerciseInstanceRow) -> Result<Self, Self::Error> {
    let body_part = row
      .body_part
      .parse::<BodyPart>()
      .map_err(|e| AnalyticsError::SourceRead(format!("exercise {}: {}", row.exercise_id, e)))?;

    Ok(Self {
      id: row.id,
      session_id: row.session_id,
      exercise: Exercise {
        id: row.exercise_id,
        name: row.name,
        body_part,
        muscle_group: row.muscle_group,
        is_unilateral: row.is_unilateral,
      },
    })
  }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SetRow {
  pub id: i64,
  pub exercise_instance_id: i64,
  pub reps: i64,
  pub weight: f64,
  pub rir: Option<i64>,
  pub completed: bool,
  pub side: String,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<SetRow> for SetRecord {
  type Error = AnalyticsError;

  fn try_from(row: SetRow) -> Result<Self, Self::Error> {
    let side = row
      .side
      .parse::<Side>()
      .map_err(|e| AnalyticsError::SourceRead(format!("set {}: {}", row.id, e)))?;
    let reps = u32::try_from(row.reps)
      .map_err(|_| AnalyticsError::SourceRead(format!("set {}: invalid reps {}", row.id, row.reps)))?;
    if !row.weight.is_finite() || row.weight < 0.0 {
      return Err(AnalyticsError::SourceRead(format!(
        "set {}: invalid weight {}",
        row.id, row.weight
      )));
    }

    Ok(Self {
      id: row.id,
      exercise_instance_id: row.exercise_instance_id,
      reps,
      weight: row.weight,
      rir: row.rir,
      completed: row.completed,
      side,
      created_at: row.created_at,
    })
  }
}
