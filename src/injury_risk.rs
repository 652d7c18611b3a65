//! Injury risk analysis
//!
//! Four independent detectors (volume spikes, opposing-pair imbalance,
//! overtraining, neglected stabilizers) emit risk factors that are combined
//! into one capped score.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::body_parts::compare_opposing_pairs;
use crate::models::BodyPart;
use crate::weekly::{trailing_week_keys, zero_filled_volumes, WeekBucket};

/// Week-over-week increase (%) above which a spike is high severity
const SPIKE_HIGH_PCT: f64 = 50.0;
/// Week-over-week increase (%) at or above which a spike is moderate
const SPIKE_MODERATE_PCT: f64 = 30.0;

const IMBALANCE_HIGH_PCT: f64 = 40.0;
const IMBALANCE_MODERATE_PCT: f64 = 25.0;

const SESSIONS_HIGH: usize = 7;
const SESSIONS_MODERATE: usize = 6;

/// Completed weeks scanned for a deload
const DELOAD_SCAN_WEEKS: usize = 8;
/// Minimum completed weeks observed before a missing deload is reported
const DELOAD_MIN_OBSERVED_WEEKS: usize = 6;
/// A week at or below this share of its predecessor counts as a deload
const DELOAD_REDUCTION_RATIO: f64 = 0.8;

/// Stabilizer share of total volume (%) below which it is under-worked
const STABILIZER_MIN_SHARE_PCT: f64 = 2.0;

const MAX_SCORE: u32 = 100;

// ----------------------------------------------------------------------------
/// Factor Types
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorType {
    VolumeSpike,
    Imbalance,
    Overtraining,
    NeglectedStabilizer,
}

impl fmt::Display for RiskFactorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RiskFactorType::VolumeSpike => write!(f, "volume_spike"),
            RiskFactorType::Imbalance => write!(f, "imbalance"),
            RiskFactorType::Overtraining => write!(f, "overtraining"),
            RiskFactorType::NeglectedStabilizer => write!(f, "neglected_stabilizer"),
        }
    }
}

impl FromStr for RiskFactorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volume_spike" => Ok(RiskFactorType::VolumeSpike),
            "imbalance" => Ok(RiskFactorType::Imbalance),
            "overtraining" => Ok(RiskFactorType::Overtraining),
            "neglected_stabilizer" => Ok(RiskFactorType::NeglectedStabilizer),
            _ => Err(format!("Invalid risk factor type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    /// Score contribution of one factor
    pub fn points(&self) -> u32 {
        match self {
            Severity::Low => 5,
            Severity::Moderate => 15,
            Severity::High => 25,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s < 30 => RiskLevel::Low,
            s if s < 60 => RiskLevel::Moderate,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Moderate => write!(f, "moderate"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor_type: RiskFactorType,
    pub severity: Severity,
    pub body_part: Option<BodyPart>,
    pub description: String,
    pub recommendation: String,
    /// Detector-specific size: a percentage, a session count or a week count
    pub magnitude: f64,
}

// ----------------------------------------------------------------------------
/// Detectors
// ----------------------------------------------------------------------------

/// Week-over-week volume increases across adjacent buckets
pub fn detect_volume_spikes(weeks: &[WeekBucket]) -> Vec<RiskFactor> {
    weeks
        .windows(2)
        .filter_map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            if prev.volume <= 0.0 {
                return None;
            }
            let increase = (curr.volume - prev.volume) / prev.volume * 100.0;
            let severity = if increase > SPIKE_HIGH_PCT {
                Severity::High
            } else if increase >= SPIKE_MODERATE_PCT {
                Severity::Moderate
            } else {
                return None;
            };

            Some(RiskFactor {
                factor_type: RiskFactorType::VolumeSpike,
                severity,
                body_part: None,
                description: format!(
                    "Volume jumped {:.0}% in the week of {} ({:.0} -> {:.0})",
                    increase, curr.week_start, prev.volume, curr.volume
                ),
                recommendation: "Increase weekly volume by no more than 10-20% at a time."
                    .to_string(),
                magnitude: increase,
            })
        })
        .collect()
}

/// Opposing-pair imbalance over the lookback volumes
pub fn detect_imbalances(volumes: &BTreeMap<BodyPart, f64>) -> Vec<RiskFactor> {
    compare_opposing_pairs(volumes)
        .into_iter()
        .filter_map(|pair| {
            let severity = if pair.difference_pct > IMBALANCE_HIGH_PCT {
                Severity::High
            } else if pair.difference_pct >= IMBALANCE_MODERATE_PCT {
                Severity::Moderate
            } else {
                return None;
            };

            Some(RiskFactor {
                factor_type: RiskFactorType::Imbalance,
                severity,
                body_part: Some(pair.weaker),
                description: format!(
                    "{} volume is {:.0}% below {}",
                    pair.weaker, pair.difference_pct, pair.dominant
                ),
                recommendation: format!(
                    "Add {} work to bring it closer to {}.",
                    pair.weaker, pair.dominant
                ),
                magnitude: pair.difference_pct,
            })
        })
        .collect()
}

/// Session frequency over the trailing 7 days and deload absence over the
/// last completed weeks
pub fn detect_overtraining(
    sessions_last_7_days: usize,
    weeks: &[WeekBucket],
    as_of: DateTime<Utc>,
) -> Vec<RiskFactor> {
    let mut factors = Vec::new();

    let severity = if sessions_last_7_days >= SESSIONS_HIGH {
        Some(Severity::High)
    } else if sessions_last_7_days >= SESSIONS_MODERATE {
        Some(Severity::Moderate)
    } else {
        None
    };
    if let Some(severity) = severity {
        factors.push(RiskFactor {
            factor_type: RiskFactorType::Overtraining,
            severity,
            body_part: None,
            description: format!("{} sessions in the last 7 days", sessions_last_7_days),
            recommendation: "Schedule at least one full rest day this week.".to_string(),
            magnitude: sessions_last_7_days as f64,
        });
    }

    // Calendar weeks before the current one; rest weeks count as zero volume
    let keys = trailing_week_keys(as_of - Duration::weeks(1), DELOAD_SCAN_WEEKS as u32);
    let volumes = zero_filled_volumes(weeks, &keys);
    let first_trained = keys
        .iter()
        .position(|key| weeks.iter().any(|w| w.week_start == *key));
    let scanned = first_trained.map_or(&volumes[..0], |i| &volumes[i..]);

    if scanned.len() >= DELOAD_MIN_OBSERVED_WEEKS {
        let had_deload = scanned
            .windows(2)
            .any(|pair| pair[1] <= pair[0] * DELOAD_REDUCTION_RATIO);
        if !had_deload {
            factors.push(RiskFactor {
                factor_type: RiskFactorType::Overtraining,
                severity: Severity::Moderate,
                body_part: None,
                description: format!(
                    "No deload in {}+ weeks",
                    DELOAD_MIN_OBSERVED_WEEKS
                ),
                recommendation: "Plan a deload week with roughly half your usual volume."
                    .to_string(),
                magnitude: scanned.len() as f64,
            });
        }
    }

    factors
}

/// Stabilizers with no volume or a very small share of total volume
pub fn detect_neglected_stabilizers(volumes: &BTreeMap<BodyPart, f64>) -> Vec<RiskFactor> {
    let total: f64 = volumes.values().sum();
    if total <= 0.0 {
        return Vec::new();
    }

    BodyPart::STABILIZERS
        .iter()
        .filter_map(|part| {
            let volume = volumes.get(part).copied().unwrap_or(0.0);
            let share = volume / total * 100.0;

            let (severity, description) = if volume <= 0.0 {
                (Severity::Moderate, format!("No {} work in the lookback window", part))
            } else if share < STABILIZER_MIN_SHARE_PCT {
                (
                    Severity::Low,
                    format!("{} is only {:.1}% of total volume", part, share),
                )
            } else {
                return None;
            };

            Some(RiskFactor {
                factor_type: RiskFactorType::NeglectedStabilizer,
                severity,
                body_part: Some(*part),
                description,
                recommendation: format!("Add 2-3 sets of {} work per week.", part),
                magnitude: share,
            })
        })
        .collect()
}

/// Sum of factor points, capped at 100
pub fn risk_score(factors: &[RiskFactor]) -> u32 {
    factors
        .iter()
        .map(|f| f.severity.points())
        .sum::<u32>()
        .min(MAX_SCORE)
}

// ----------------------------------------------------------------------------
/// Risk Report
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFactorsByType {
    pub volume_spikes: Vec<RiskFactor>,
    pub imbalances: Vec<RiskFactor>,
    pub overtraining: Vec<RiskFactor>,
    pub neglected_stabilizers: Vec<RiskFactor>,
}

impl RiskFactorsByType {
    fn partition(factors: &[RiskFactor]) -> Self {
        let mut by_type = Self::default();
        for factor in factors {
            let bucket = match factor.factor_type {
                RiskFactorType::VolumeSpike => &mut by_type.volume_spikes,
                RiskFactorType::Imbalance => &mut by_type.imbalances,
                RiskFactorType::Overtraining => &mut by_type.overtraining,
                RiskFactorType::NeglectedStabilizer => &mut by_type.neglected_stabilizers,
            };
            bucket.push(factor.clone());
        }
        by_type
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjuryRiskReport {
    pub risk_level: RiskLevel,
    pub risk_score: u32,
    pub factors: Vec<RiskFactor>,
    pub factors_by_type: RiskFactorsByType,
    /// Factor recommendations, first occurrence only
    pub recommendations: Vec<String>,
}

impl InjuryRiskReport {
    /// `weeks` and `volumes` cover the lookback window; `sessions_last_7_days`
    /// counts completed sessions started in the trailing 7 days.
    pub fn compute(
        weeks: &[WeekBucket],
        volumes: &BTreeMap<BodyPart, f64>,
        sessions_last_7_days: usize,
        as_of: DateTime<Utc>,
    ) -> Self {
        let mut factors = detect_volume_spikes(weeks);
        factors.extend(detect_imbalances(volumes));
        factors.extend(detect_overtraining(sessions_last_7_days, weeks, as_of));
        factors.extend(detect_neglected_stabilizers(volumes));

        Self::from_factors(factors)
    }

    pub fn from_factors(factors: Vec<RiskFactor>) -> Self {
        let risk_score = risk_score(&factors);
        let risk_level = RiskLevel::from_score(risk_score);

        let mut recommendations: Vec<String> = Vec::new();
        for factor in &factors {
            if !recommendations.contains(&factor.recommendation) {
                recommendations.push(factor.recommendation.clone());
            }
        }

        debug!(
            factors = factors.len(),
            score = risk_score,
            level = %risk_level,
            "computed injury risk"
        );

        Self {
            risk_level,
            risk_score,
            factors_by_type: RiskFactorsByType::partition(&factors),
            factors,
            recommendations,
        }
    }
}

// ----------------------------------------------------------------------------
/// Tests
// ----------------------------------------------------------------------------
