//! Training analytics over a strength-training log: weekly load, training
//! phases, body-part balance, injury risk, left/right symmetry and goal
//! progress.

pub mod aggregates;
pub mod body_parts;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod goals;
pub mod injury_risk;
pub mod logging;
pub mod models;
pub mod periodization;
pub mod snapshot;
pub mod symmetry;
pub mod weekly;

#[cfg(test)]
mod test_utils;

pub use config::AnalysisConfig;
pub use db::LogStore;
pub use engine::{TrainingAnalytics, TrainingReport, WeeklyVolumeReport};
pub use error::{AnalyticsError, Result};
pub use snapshot::{LogSnapshot, LookbackWindow, SnapshotKey};
