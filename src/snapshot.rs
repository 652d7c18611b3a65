//! Immutable, time-boxed view of one user's training log
//!
//! A snapshot joins sessions, exercise instances and sets once at fetch time.
//! Only completed sets inside the window survive the join; every analysis is
//! a pure function over a snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{BodyPart, ExerciseInstance, Session, SetRecord, Side};
use crate::weekly::{start_of_day, week_start};

/// ---------------------------------------------------------------------------
/// Lookback Window
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "weeks", rename_all = "snake_case")]
pub enum LookbackWindow {
  AllTime,
  /// The N Monday-aligned weeks ending with the week containing `as_of`
  Weeks(u32),
}

impl LookbackWindow {
  pub fn start(&self, as_of: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match self {
      LookbackWindow::AllTime => None,
      LookbackWindow::Weeks(weeks) => {
        let first_week = week_start(as_of) - Duration::weeks((*weeks as i64 - 1).max(0));
        Some(start_of_day(first_week))
      }
    }
  }
}

/// ---------------------------------------------------------------------------
/// Performed Sets
/// ---------------------------------------------------------------------------

/// A completed set joined to its exercise and session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformedSet {
  pub set_id: i64,
  pub session_id: i64,
  pub exercise_id: i64,
  pub exercise_name: String,
  pub body_part: BodyPart,
  pub is_unilateral: bool,
  pub side: Side,
  pub reps: u32,
  pub weight: f64,
  pub performed_at: DateTime<Utc>,
}

impl PerformedSet {
  pub fn volume(&self) -> f64 {
    self.reps as f64 * self.weight
  }
}

/// Key under which derived results may be cached by callers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
  pub user_id: i64,
  pub window: LookbackWindow,
  /// Latest set timestamp in the snapshot
  pub high_water_mark: Option<DateTime<Utc>>,
}

/// ---------------------------------------------------------------------------
/// Snapshot
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSnapshot {
  pub user_id: i64,
  pub as_of: DateTime<Utc>,
  pub window: LookbackWindow,
  /// Sessions started inside the window, oldest first
  pub sessions: Vec<Session>,
  /// Completed sets inside the window, oldest first
  pub sets: Vec<PerformedSet>,
}

impl LogSnapshot {
  pub fn empty(user_id: i64, as_of: DateTime<Utc>, window: LookbackWindow) -> Self {
    Self {
      user_id,
      as_of,
      window,
      sessions: Vec::new(),
      sets: Vec::new(),
    }
  }

  /// Join raw log records into a snapshot.
  ///
  /// Incomplete sets, sets outside the window and sets whose instance or
  /// session is not part of the input are dropped. A left/right tag on a
  /// non-unilateral exercise is normalised to `none`.
  pub fn assemble(
    user_id: i64,
    as_of: DateTime<Utc>,
    window: LookbackWindow,
    sessions: Vec<Session>,
    instances: Vec<ExerciseInstance>,
    sets: Vec<SetRecord>,
  ) -> Self {
    let start = window.start(as_of);
    let in_window =
      |ts: DateTime<Utc>| ts <= as_of && start.map_or(true, |s| ts >= s);

    let owned_sessions: HashMap<i64, &Session> = sessions
      .iter()
      .filter(|s| s.user_id == user_id)
      .map(|s| (s.id, s))
      .collect();
    let instances_by_id: HashMap<i64, &ExerciseInstance> = instances
      .iter()
      .filter(|i| owned_sessions.contains_key(&i.session_id))
      .map(|i| (i.id, i))
      .collect();

    let total_sets = sets.len();
    let mut performed: Vec<PerformedSet> = Vec::new();

    for set in sets {
      if !set.completed || !in_window(set.created_at) {
        continue;
      }
      let Some(instance) = instances_by_id.get(&set.exercise_instance_id) else {
        debug!(set_id = set.id, "dropping set without a known exercise instance");
        continue;
      };

      let exercise = &instance.exercise;
      let side = if !exercise.is_unilateral && set.side != Side::Unsided {
        warn!(
          set_id = set.id,
          exercise = %exercise.name,
          side = %set.side,
          "side tag on a non-unilateral exercise, treating as none"
        );
        Side::Unsided
      } else {
        set.side
      };

      performed.push(PerformedSet {
        set_id: set.id,
        session_id: instance.session_id,
        exercise_id: exercise.id,
        exercise_name: exercise.name.clone(),
        body_part: exercise.body_part,
        is_unilateral: exercise.is_unilateral,
        side,
        reps: set.reps,
        weight: set.weight,
        performed_at: set.created_at,
      });
    }

    performed.sort_by(|a, b| {
      a.performed_at
        .cmp(&b.performed_at)
        .then(a.set_id.cmp(&b.set_id))
    });

    let mut kept_sessions: Vec<Session> = sessions
      .into_iter()
      .filter(|s| s.user_id == user_id && in_window(s.started_at))
      .collect();
    kept_sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));

    debug!(
      user_id,
      sessions = kept_sessions.len(),
      sets_in = total_sets,
      sets_kept = performed.len(),
      "assembled log snapshot"
    );

    Self {
      user_id,
      as_of,
      window,
      sessions: kept_sessions,
      sets: performed,
    }
  }

  /// Narrow this snapshot to a shorter window with the same `as_of`
  pub fn restrict(&self, window: LookbackWindow) -> Self {
    let start = window.start(self.as_of);
    let keep = |ts: DateTime<Utc>| start.map_or(true, |s| ts >= s);

    Self {
      user_id: self.user_id,
      as_of: self.as_of,
      window,
      sessions: self
        .sessions
        .iter()
        .filter(|s| keep(s.started_at))
        .cloned()
        .collect(),
      sets: self
        .sets
        .iter()
        .filter(|s| keep(s.performed_at))
        .cloned()
        .collect(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.sets.is_empty() && self.sessions.is_empty()
  }

  pub fn total_volume(&self) -> f64 {
    self.sets.iter().map(PerformedSet::volume).sum()
  }

  pub fn high_water_mark(&self) -> Option<DateTime<Utc>> {
    self.sets.iter().map(|s| s.performed_at).max()
  }

  pub fn cache_key(&self) -> SnapshotKey {
    SnapshotKey {
      user_id: self.user_id,
      window: self.window,
      high_water_mark: self.high_water_mark(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{mock_exercise, mock_instance, mock_session, mock_set_record, utc};

  #[test]
  fn test_window_start_is_monday_aligned() {
    // Wednesday
    let as_of = utc(2024, 3, 20, 15);
    assert_eq!(LookbackWindow::Weeks(1).start(as_of), Some(utc(2024, 3, 18, 0)));
    assert_eq!(LookbackWindow::Weeks(3).start(as_of), Some(utc(2024, 3, 4, 0)));
    assert_eq!(LookbackWindow::AllTime.start(as_of), None);
  }

  #[test]
  fn test_only_completed_sets_are_kept() {
    let as_of = utc(2024, 3, 20, 20);
    let bench = mock_exercise(1, "Bench Press", BodyPart::Chest, false);
    let sessions = vec![mock_session(10, 1, utc(2024, 3, 19, 8))];
    let instances = vec![mock_instance(100, 10, bench)];

    let mut skipped = mock_set_record(2, 100, 10, 80.0, utc(2024, 3, 19, 8));
    skipped.completed = false;
    let sets = vec![mock_set_record(1, 100, 10, 80.0, utc(2024, 3, 19, 8)), skipped];

    let snapshot =
      LogSnapshot::assemble(1, as_of, LookbackWindow::Weeks(4), sessions, instances, sets);

    assert_eq!(snapshot.sets.len(), 1);
    assert_eq!(snapshot.sets[0].set_id, 1);
    assert_eq!(snapshot.total_volume(), 800.0);
  }

  #[test]
  fn test_side_normalised_for_bilateral_exercise() {
    let as_of = utc(2024, 3, 20, 20);
    let squat = mock_exercise(1, "Back Squat", BodyPart::Quads, false);
    let mut set = mock_set_record(1, 100, 5, 120.0, utc(2024, 3, 19, 8));
    set.side = Side::Left;

    let snapshot = LogSnapshot::assemble(
      1,
      as_of,
      LookbackWindow::AllTime,
      vec![mock_session(10, 1, utc(2024, 3, 19, 8))],
      vec![mock_instance(100, 10, squat)],
      vec![set],
    );

    assert_eq!(snapshot.sets[0].side, Side::Unsided);
  }

  #[test]
  fn test_sets_outside_window_and_other_users_are_dropped() {
    let as_of = utc(2024, 3, 20, 20);
    let row = mock_exercise(2, "Barbell Row", BodyPart::Back, false);
    let sessions = vec![
      mock_session(10, 1, utc(2023, 1, 2, 8)),
      mock_session(11, 1, utc(2024, 3, 19, 8)),
      mock_session(12, 2, utc(2024, 3, 19, 8)),
    ];
    let instances = vec![
      mock_instance(100, 10, row.clone()),
      mock_instance(101, 11, row.clone()),
      mock_instance(102, 12, row),
    ];
    let sets = vec![
      mock_set_record(1, 100, 10, 60.0, utc(2023, 1, 2, 8)),
      mock_set_record(2, 101, 10, 60.0, utc(2024, 3, 19, 8)),
      mock_set_record(3, 102, 10, 60.0, utc(2024, 3, 19, 8)),
      // after as_of
      mock_set_record(4, 101, 10, 60.0, utc(2024, 3, 21, 8)),
    ];

    let snapshot =
      LogSnapshot::assemble(1, as_of, LookbackWindow::Weeks(12), sessions, instances, sets);

    assert_eq!(snapshot.sets.iter().map(|s| s.set_id).collect::<Vec<_>>(), vec![2]);
    assert_eq!(snapshot.sessions.len(), 1);
    assert_eq!(snapshot.high_water_mark(), Some(utc(2024, 3, 19, 8)));
  }

  #[test]
  fn test_restrict_narrows_window() {
    let as_of = utc(2024, 3, 20, 20);
    let press = mock_exercise(3, "Overhead Press", BodyPart::Shoulders, false);
    let snapshot = LogSnapshot::assemble(
      1,
      as_of,
      LookbackWindow::AllTime,
      vec![
        mock_session(10, 1, utc(2023, 6, 1, 8)),
        mock_session(11, 1, utc(2024, 3, 18, 8)),
      ],
      vec![mock_instance(100, 10, press.clone()), mock_instance(101, 11, press)],
      vec![
        mock_set_record(1, 100, 5, 50.0, utc(2023, 6, 1, 8)),
        mock_set_record(2, 101, 5, 50.0, utc(2024, 3, 18, 8)),
      ],
    );

    let recent = snapshot.restrict(LookbackWindow::Weeks(2));
    assert_eq!(recent.sets.len(), 1);
    assert_eq!(recent.sessions.len(), 1);
    assert_eq!(recent.window, LookbackWindow::Weeks(2));
    assert_ne!(recent.cache_key(), snapshot.cache_key());
  }
}
