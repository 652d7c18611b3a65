//! Periodization Phase Classifier
//!
//! Labels each observed week relative to the whole window:
//! - deload: volume well below the mean
//! - intensification: intensity up while volume holds or drops
//! - accumulation: volume up while intensity holds or drops
//! - transition: anything else
//!
//! Runs of identical labels merge into phases, and the latest phase drives
//! the recommended next phase. Going too long without a deload overrides
//! every other rule.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::weekly::WeekBucket;

/// Week volume below this fraction of the mean is a deload
const DELOAD_VOLUME_RATIO: f64 = 0.6;

/// Ratio to the mean that counts as "elevated"
const ELEVATED_RATIO: f64 = 1.1;

/// More weeks than this since the last deload forces one
const MAX_WEEKS_WITHOUT_DELOAD: u32 = 6;

const MIN_ACCUMULATION_WEEKS: u32 = 4;
const MIN_INTENSIFICATION_WEEKS: u32 = 3;

// ---------------------------------------------------------------------------
/// Phase Type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    /// Volume building block
    Accumulation,
    /// Heavier, lower-volume block
    Intensification,
    /// Reduced volume for recovery
    Deload,
    /// Near-baseline training between blocks
    Transition,
}

impl std::fmt::Display for PhaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accumulation => write!(f, "accumulation"),
            Self::Intensification => write!(f, "intensification"),
            Self::Deload => write!(f, "deload"),
            Self::Transition => write!(f, "transition"),
        }
    }
}

impl std::str::FromStr for PhaseType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accumulation" => Ok(Self::Accumulation),
            "intensification" => Ok(Self::Intensification),
            "deload" => Ok(Self::Deload),
            "transition" => Ok(Self::Transition),
            _ => Err(format!("Unknown phase type: {}", s)),
        }
    }
}

impl PhaseType {
    /// Classify one week against the window means
    pub fn classify(volume: f64, intensity: f64, mean_volume: f64, mean_intensity: f64) -> Self {
        if volume < DELOAD_VOLUME_RATIO * mean_volume {
            PhaseType::Deload
        } else if intensity > ELEVATED_RATIO * mean_intensity
            && volume < ELEVATED_RATIO * mean_volume
        {
            PhaseType::Intensification
        } else if volume > ELEVATED_RATIO * mean_volume
            && intensity < ELEVATED_RATIO * mean_intensity
        {
            PhaseType::Accumulation
        } else {
            PhaseType::Transition
        }
    }

    fn characteristics(&self) -> Vec<String> {
        let items: &[&str] = match self {
            PhaseType::Accumulation => &["High training volume", "Moderate relative intensity"],
            PhaseType::Intensification => &["Elevated relative intensity", "Volume held or reduced"],
            PhaseType::Deload => &["Volume well below baseline", "Recovery emphasis"],
            PhaseType::Transition => &["Volume and intensity near baseline"],
        };
        items.iter().map(|s| s.to_string()).collect()
    }

    fn phase_recommendation(&self) -> &'static str {
        match self {
            PhaseType::Accumulation => {
                "Build work capacity: add sets gradually and keep most sets shy of failure"
            }
            PhaseType::Intensification => {
                "Push load on main lifts with fewer sets; keep accessory volume low"
            }
            PhaseType::Deload => "Keep loads moderate and cut sets roughly in half to recover",
            PhaseType::Transition => "Maintain current training and pick the next block deliberately",
        }
    }
}

// ---------------------------------------------------------------------------
/// Week Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekClassification {
    pub week_start: NaiveDate,
    pub phase_type: PhaseType,
    pub volume: f64,
    pub average_intensity: f64,
}

/// Label every week against the mean volume and intensity of the window
pub fn classify_weeks(weeks: &[WeekBucket]) -> Vec<WeekClassification> {
    if weeks.is_empty() {
        return Vec::new();
    }

    let n = weeks.len() as f64;
    let mean_volume = weeks.iter().map(|w| w.volume).sum::<f64>() / n;
    let mean_intensity = weeks.iter().map(|w| w.average_intensity).sum::<f64>() / n;

    weeks
        .iter()
        .map(|w| WeekClassification {
            week_start: w.week_start,
            phase_type: PhaseType::classify(
                w.volume,
                w.average_intensity,
                mean_volume,
                mean_intensity,
            ),
            volume: w.volume,
            average_intensity: w.average_intensity,
        })
        .collect()
}

// ---------------------------------------------------------------------------
/// Training Phase: a run of identically classified weeks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPhase {
    pub phase_type: PhaseType,
    pub start_week: NaiveDate,
    pub end_week: NaiveDate,
    pub week_count: u32,
    /// Sum of member week volumes
    pub total_volume: f64,
    /// Mean of member week intensities
    pub average_intensity: f64,
    pub characteristics: Vec<String>,
    pub recommendation: String,
}

/// Merge consecutive weeks with the same label into phases
pub fn merge_phases(classified: &[WeekClassification]) -> Vec<TrainingPhase> {
    let mut phases: Vec<TrainingPhase> = Vec::new();

    for week in classified {
        if let Some(phase) = phases
            .last_mut()
            .filter(|p| p.phase_type == week.phase_type)
        {
            // Running mean of intensity over member weeks
            let n = phase.week_count as f64;
            phase.average_intensity =
                (phase.average_intensity * n + week.average_intensity) / (n + 1.0);
            phase.week_count += 1;
            phase.total_volume += week.volume;
            phase.end_week = week.week_start;
            continue;
        }

        phases.push(TrainingPhase {
            phase_type: week.phase_type,
            start_week: week.week_start,
            end_week: week.week_start,
            week_count: 1,
            total_volume: week.volume,
            average_intensity: week.average_intensity,
            characteristics: week.phase_type.characteristics(),
            recommendation: week.phase_type.phase_recommendation().to_string(),
        });
    }

    phases
}

// ---------------------------------------------------------------------------
/// Periodization Analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodizationAnalysis {
    pub current_phase: Option<TrainingPhase>,
    pub phase_history: Vec<TrainingPhase>,
    pub week_classifications: Vec<WeekClassification>,
    pub weeks_in_current_phase: u32,
    pub weeks_since_deload: u32,
    pub recommended_next_phase: PhaseType,
    pub recommendation: String,
}

impl PeriodizationAnalysis {
    pub fn compute(weeks: &[WeekBucket]) -> Self {
        let week_classifications = classify_weeks(weeks);
        let phase_history = merge_phases(&week_classifications);

        let Some(current) = phase_history.last().cloned() else {
            return Self {
                current_phase: None,
                phase_history,
                week_classifications,
                weeks_in_current_phase: 0,
                weeks_since_deload: 0,
                recommended_next_phase: PhaseType::Accumulation,
                recommendation: "No training history yet. Start with an accumulation phase to \
                                 build a volume base."
                    .to_string(),
            };
        };

        let weeks_since_deload = weeks_since_last_deload(&phase_history);
        let previous = phase_history
            .len()
            .checked_sub(2)
            .and_then(|i| phase_history.get(i))
            .map(|p| p.phase_type);

        let (recommended_next_phase, recommendation) =
            Self::recommend(&current, previous, weeks_since_deload);

        debug!(
            weeks = weeks.len(),
            phases = phase_history.len(),
            current = %current.phase_type,
            next = %recommended_next_phase,
            "classified training phases"
        );

        Self {
            weeks_in_current_phase: current.week_count,
            current_phase: Some(current),
            phase_history,
            week_classifications,
            weeks_since_deload,
            recommended_next_phase,
            recommendation,
        }
    }

    fn recommend(
        current: &TrainingPhase,
        previous: Option<PhaseType>,
        weeks_since_deload: u32,
    ) -> (PhaseType, String) {
        if weeks_since_deload > MAX_WEEKS_WITHOUT_DELOAD {
            return (
                PhaseType::Deload,
                format!(
                    "{} weeks without a deload. Take a deload week now to manage fatigue.",
                    weeks_since_deload
                ),
            );
        }

        let weeks = current.week_count;
        match current.phase_type {
            PhaseType::Accumulation if weeks >= MIN_ACCUMULATION_WEEKS => (
                PhaseType::Intensification,
                format!(
                    "Accumulation has run {} weeks. Shift to intensification: heavier loads, fewer sets.",
                    weeks
                ),
            ),
            PhaseType::Accumulation => (
                PhaseType::Accumulation,
                format!(
                    "Continue accumulating volume for {} more week(s) before intensifying.",
                    MIN_ACCUMULATION_WEEKS - weeks
                ),
            ),
            PhaseType::Intensification if weeks >= MIN_INTENSIFICATION_WEEKS => (
                PhaseType::Deload,
                format!(
                    "Intensification has run {} weeks. Schedule a deload to consolidate gains.",
                    weeks
                ),
            ),
            PhaseType::Intensification => (
                PhaseType::Intensification,
                format!(
                    "Continue intensifying for {} more week(s), then deload.",
                    MIN_INTENSIFICATION_WEEKS - weeks
                ),
            ),
            PhaseType::Deload => (
                PhaseType::Accumulation,
                "Deload complete. Start a new accumulation phase.".to_string(),
            ),
            PhaseType::Transition => match previous {
                Some(PhaseType::Accumulation) => (
                    PhaseType::Intensification,
                    "Coming off an accumulation block. Move into intensification.".to_string(),
                ),
                Some(PhaseType::Intensification) => (
                    PhaseType::Deload,
                    "Coming off an intensification block. Take a deload next.".to_string(),
                ),
                _ => (
                    PhaseType::Accumulation,
                    "Begin an accumulation phase to build volume.".to_string(),
                ),
            },
        }
    }
}

/// Weeks in phases after the most recent deload phase (all weeks if none)
fn weeks_since_last_deload(phases: &[TrainingPhase]) -> u32 {
    phases
        .iter()
        .rev()
        .take_while(|p| p.phase_type != PhaseType::Deload)
        .map(|p| p.week_count)
        .sum()
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
