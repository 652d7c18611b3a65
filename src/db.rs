//! SQLite log store
//!
//! Read-only access to sessions, exercise instances, sets and goals. The
//! store is the sole writer of the log; analyses only ever read from it.

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::goal::GoalRow;
use crate::models::workout::{ExerciseInstanceRow, SetRow};
use crate::models::{ExerciseInstance, Goal, Session, SetRecord};
use crate::snapshot::{LogSnapshot, LookbackWindow};

pub type DbPool = SqlitePool;

/// Ids bound per IN (...) query
const ID_CHUNK_SIZE: usize = 500;

/// Sessions are fetched from this far before the window start so sets
/// logged inside the window for a session started just before it are kept
const SESSION_FETCH_MARGIN_DAYS: i64 = 1;

fn placeholders(n: usize) -> String {
  vec!["?"; n].join(", ")
}

#[derive(Debug, Clone)]
pub struct LogStore {
  pool: DbPool,
}

impl LogStore {
  /// Open a pool for `database_url` and run migrations
  pub async fn connect(database_url: &str) -> Result<Self> {
    info!(url = database_url, "opening log store");

    let pool = SqlitePoolOptions::new()
      .max_connections(5)
      .connect(database_url)
      .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    debug!("log store migrations applied");
    Ok(Self { pool })
  }

  pub fn from_pool(pool: DbPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  /// Sessions owned by `user_id` started in [from, to]; `from = None` is unbounded
  pub async fn fetch_sessions(
    &self,
    user_id: i64,
    from: Option<DateTime<Utc>>,
    to: DateTime<Utc>,
  ) -> Result<Vec<Session>> {
    let sessions = match from {
      Some(from) => {
        sqlx::query_as::<_, Session>(
          r#"
          SELECT id, user_id, started_at, completed_at
          FROM sessions
          WHERE user_id = ?1 AND started_at >= ?2 AND started_at <= ?3
          ORDER BY started_at, id
          "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?
      }
      None => {
        sqlx::query_as::<_, Session>(
          r#"
          SELECT id, user_id, started_at, completed_at
          FROM sessions
          WHERE user_id = ?1 AND started_at <= ?2
          ORDER BY started_at, id
          "#,
        )
        .bind(user_id)
        .bind(to)
        .fetch_all(&self.pool)
        .await?
      }
    };

    Ok(sessions)
  }

  /// Exercise instances for the given sessions, joined to their exercise
  pub async fn fetch_exercise_instances(
    &self,
    session_ids: &[i64],
  ) -> Result<Vec<ExerciseInstance>> {
    let mut instances = Vec::new();

    for chunk in session_ids.chunks(ID_CHUNK_SIZE) {
      let sql = format!(
        r#"
        SELECT ei.id, ei.session_id, e.id AS exercise_id, e.name, e.body_part,
               e.muscle_group, e.is_unilateral
        FROM exercise_instances ei
        JOIN exercises e ON e.id = ei.exercise_id
        WHERE ei.session_id IN ({})
        ORDER BY ei.session_id, ei.position, ei.id
        "#,
        placeholders(chunk.len())
      );

      let mut query = sqlx::query_as::<_, ExerciseInstanceRow>(&sql);
      for id in chunk {
        query = query.bind(*id);
      }

      for row in query.fetch_all(&self.pool).await? {
        instances.push(ExerciseInstance::try_from(row)?);
      }
    }

    Ok(instances)
  }

  /// Completed sets for the given exercise instances
  pub async fn fetch_completed_sets(&self, instance_ids: &[i64]) -> Result<Vec<SetRecord>> {
    let mut sets = Vec::new();

    for chunk in instance_ids.chunks(ID_CHUNK_SIZE) {
      let sql = format!(
        r#"
        SELECT id, exercise_instance_id, reps, weight, rir, completed, side, created_at
        FROM sets
        WHERE completed = 1 AND exercise_instance_id IN ({})
        ORDER BY created_at, id
        "#,
        placeholders(chunk.len())
      );

      let mut query = sqlx::query_as::<_, SetRow>(&sql);
      for id in chunk {
        query = query.bind(*id);
      }

      for row in query.fetch_all(&self.pool).await? {
        sets.push(SetRecord::try_from(row)?);
      }
    }

    Ok(sets)
  }

  pub async fn fetch_active_goals(&self, user_id: i64) -> Result<Vec<Goal>> {
    let rows = sqlx::query_as::<_, GoalRow>(
      r#"
      SELECT id, user_id, name, goal_type, timeframe, target_value, body_part, exercises_json
      FROM goals
      WHERE user_id = ?1 AND active = 1
      ORDER BY id
      "#,
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(Goal::try_from).collect()
  }

  /// Fetch and join everything for `user_id` inside `window` ending at `as_of`
  pub async fn load_snapshot(
    &self,
    user_id: i64,
    as_of: DateTime<Utc>,
    window: LookbackWindow,
  ) -> Result<LogSnapshot> {
    let from = window
      .start(as_of)
      .map(|start| start - Duration::days(SESSION_FETCH_MARGIN_DAYS));

    let sessions = self.fetch_sessions(user_id, from, as_of).await?;
    if sessions.is_empty() {
      debug!(user_id, "no sessions in window");
      return Ok(LogSnapshot::empty(user_id, as_of, window));
    }

    let session_ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
    let instances = self.fetch_exercise_instances(&session_ids).await?;

    let instance_ids: Vec<i64> = instances.iter().map(|i| i.id).collect();
    let sets = self.fetch_completed_sets(&instance_ids).await?;

    Ok(LogSnapshot::assemble(
      user_id, as_of, window, sessions, instances, sets,
    ))
  }
}
