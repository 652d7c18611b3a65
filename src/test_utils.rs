//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seeders for the log store
//! - Mock data factories
//! - Helper assertions

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::models::{BodyPart, Exercise, ExerciseInstance, Session, SetRecord, Side};
use crate::snapshot::PerformedSet;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Insert an exercise definition, returns its id
pub async fn seed_exercise(
  pool: &SqlitePool,
  name: &str,
  body_part: BodyPart,
  is_unilateral: bool,
) -> i64 {
  sqlx::query(
    "INSERT INTO exercises (name, body_part, muscle_group, is_unilateral) VALUES (?1, ?2, NULL, ?3)",
  )
  .bind(name)
  .bind(body_part.as_str())
  .bind(is_unilateral)
  .execute(pool)
  .await
  .expect("Failed to insert exercise")
  .last_insert_rowid()
}

/// Insert a completed session with one exercise instance and the given sets
/// (reps, weight, side, completed). Returns the session id.
pub async fn seed_session_with_sets(
  pool: &SqlitePool,
  user_id: i64,
  exercise_id: i64,
  started_at: DateTime<Utc>,
  sets: &[(i64, f64, Side, bool)],
) -> i64 {
  let session_id = sqlx::query(
    "INSERT INTO sessions (user_id, started_at, completed_at) VALUES (?1, ?2, ?3)",
  )
  .bind(user_id)
  .bind(started_at)
  .bind(started_at + Duration::hours(1))
  .execute(pool)
  .await
  .expect("Failed to insert session")
  .last_insert_rowid();

  let instance_id = sqlx::query(
    "INSERT INTO exercise_instances (session_id, exercise_id, position) VALUES (?1, ?2, 0)",
  )
  .bind(session_id)
  .bind(exercise_id)
  .execute(pool)
  .await
  .expect("Failed to insert exercise instance")
  .last_insert_rowid();

  for (i, (reps, weight, side, completed)) in sets.iter().enumerate() {
    sqlx::query(
      r#"
      INSERT INTO sets (exercise_instance_id, reps, weight, rir, completed, side, created_at)
      VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6)
      "#,
    )
    .bind(instance_id)
    .bind(reps)
    .bind(weight)
    .bind(completed)
    .bind(side.to_string())
    .bind(started_at + Duration::minutes(i as i64 * 3))
    .execute(pool)
    .await
    .expect("Failed to insert set");
  }

  session_id
}

/// Insert a goal row, returns its id
pub async fn seed_goal(
  pool: &SqlitePool,
  user_id: i64,
  name: &str,
  goal_type: &str,
  timeframe: &str,
  target_value: Option<f64>,
  body_part: Option<&str>,
  exercises_json: Option<&str>,
) -> i64 {
  sqlx::query(
    r#"
    INSERT INTO goals (user_id, name, goal_type, timeframe, target_value, body_part, exercises_json, active)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)
    "#,
  )
  .bind(user_id)
  .bind(name)
  .bind(goal_type)
  .bind(timeframe)
  .bind(target_value)
  .bind(body_part)
  .bind(exercises_json)
  .execute(pool)
  .await
  .expect("Failed to insert goal")
  .last_insert_rowid()
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_exercise(id: i64, name: &str, body_part: BodyPart, is_unilateral: bool) -> Exercise {
  Exercise {
    id,
    name: name.to_string(),
    body_part,
    muscle_group: None,
    is_unilateral,
  }
}

pub fn mock_session(id: i64, user_id: i64, started_at: DateTime<Utc>) -> Session {
  Session {
    id,
    user_id,
    started_at,
    completed_at: Some(started_at + Duration::hours(1)),
  }
}

pub fn mock_instance(id: i64, session_id: i64, exercise: Exercise) -> ExerciseInstance {
  ExerciseInstance {
    id,
    session_id,
    exercise,
  }
}

pub fn mock_set_record(
  id: i64,
  exercise_instance_id: i64,
  reps: u32,
  weight: f64,
  created_at: DateTime<Utc>,
) -> SetRecord {
  SetRecord {
    id,
    exercise_instance_id,
    reps,
    weight,
    rir: None,
    completed: true,
    side: Side::Unsided,
    created_at,
  }
}

/// A completed, joined set for a bilateral exercise named after its body part
pub fn mock_set(
  session_id: i64,
  body_part: BodyPart,
  reps: u32,
  weight: f64,
  performed_at: DateTime<Utc>,
) -> PerformedSet {
  PerformedSet {
    set_id: session_id * 1000 + reps as i64,
    session_id,
    exercise_id: BodyPart::ALL.iter().position(|p| *p == body_part).unwrap_or(0) as i64,
    exercise_name: format!("{} exercise", body_part),
    body_part,
    is_unilateral: false,
    side: Side::Unsided,
    reps,
    weight,
    performed_at,
  }
}

/// A completed set of a unilateral exercise
pub fn mock_unilateral_set(
  exercise_name: &str,
  side: Side,
  reps: u32,
  weight: f64,
  performed_at: DateTime<Utc>,
) -> PerformedSet {
  PerformedSet {
    set_id: 0,
    session_id: 1,
    exercise_id: 99,
    exercise_name: exercise_name.to_string(),
    body_part: BodyPart::Quads,
    is_unilateral: true,
    side,
    reps,
    weight,
    performed_at,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// UTC timestamp at the given date and hour
pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(year, month, day, hour, 0, 0)
    .single()
    .expect("valid test timestamp")
}

/// Timestamp N days before `anchor`
pub fn days_before(anchor: DateTime<Utc>, days: i64) -> DateTime<Utc> {
  anchor - Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('sessions', 'exercise_instances', 'sets', 'exercises', 'goals')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 5, "Expected 5 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_session_inserts_sets() {
    let pool = setup_test_db().await;

    let exercise_id = seed_exercise(&pool, "Bench Press", BodyPart::Chest, false).await;
    seed_session_with_sets(
      &pool,
      1,
      exercise_id,
      utc(2024, 3, 4, 8),
      &[(10, 60.0, Side::Unsided, true), (8, 65.0, Side::Unsided, false)],
    )
    .await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sets")
      .fetch_one(&pool)
      .await
      .expect("Failed to count sets");
    assert_eq!(count, 2);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_time_helpers() {
    let anchor = utc(2024, 3, 20, 12);
    assert_eq!((anchor - days_before(anchor, 7)).num_days(), 7);
  }
}
