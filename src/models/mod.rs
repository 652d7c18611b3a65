pub mod goal;
pub mod workout;

pub use goal::{Goal, GoalTarget, GoalType, Timeframe};
pub use workout::{BodyPart, Exercise, ExerciseInstance, Session, SetRecord, Side};
