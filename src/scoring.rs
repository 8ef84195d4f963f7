// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Performance Scoring
//!
//! Cohort-relative min-max scoring. Every metric is rescaled to `[0, 1]` over the
//! records passed in, flipped when lower is better, and the composite
//! Performance Score is the unweighted sum of those contributions.
//!
//! Scores only mean something inside the cohort they were computed over: adding
//! or removing a single record moves every other record's score. Exclusions
//! must be applied before calling [`ScoringEngine::score`].

use serde::{Deserialize, Serialize};

use crate::models::{MergedRecord, RaceRecord};

/// Numeric record fields a metric can be computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    AverageSpeed,
    EfficiencyFactor,
    KilojoulesPerHour,
    PowerToWeight,
    Variability,
    PowerHr,
    MaxHeartRate,
    DistanceKm,
    MovingTimeMinutes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// How missing raw values take part in normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Range over present values; a missing value has no contribution and
    /// makes the composite null
    #[default]
    Propagate,
    /// Missing values become 0 before the range is taken
    ZeroBeforeRange,
    /// Range over present values, missing values read as 0 afterwards.
    /// A 0 below the range yields a negative contribution.
    ZeroAfterRange,
}

/// One scored metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub field: ScoreField,
    pub direction: Direction,
    #[serde(default)]
    pub null_policy: NullPolicy,
    /// Suffix of the `Normalized <label>` output column
    pub label: String,
}

impl MetricSpec {
    pub fn new(field: ScoreField, direction: Direction, label: &str) -> Self {
        Self {
            field,
            direction,
            null_policy: NullPolicy::Propagate,
            label: label.to_string(),
        }
    }

    pub fn with_null_policy(mut self, null_policy: NullPolicy) -> Self {
        self.null_policy = null_policy;
        self
    }
}

/// Speed, efficiency factor, energy rate and power-to-weight
pub fn canonical_metrics() -> Vec<MetricSpec> {
    vec![
        MetricSpec::new(ScoreField::AverageSpeed, Direction::HigherIsBetter, "Speed"),
        MetricSpec::new(ScoreField::EfficiencyFactor, Direction::HigherIsBetter, "Efficiency Factor"),
        MetricSpec::new(ScoreField::KilojoulesPerHour, Direction::LowerIsBetter, "Kilojoules/Hour"),
        MetricSpec::new(ScoreField::PowerToWeight, Direction::HigherIsBetter, "Power/Weight")
            .with_null_policy(NullPolicy::ZeroBeforeRange),
    ]
}

/// The canonical four with power/weight ranged over present values only.
///
/// Used by the outlier and pooled-race views. A race without power/weight
/// reads as 0 below the cohort minimum, so its score can go negative.
pub fn outlier_metrics() -> Vec<MetricSpec> {
    canonical_metrics()
        .into_iter()
        .map(|metric| match metric.field {
            ScoreField::PowerToWeight => metric.with_null_policy(NullPolicy::ZeroAfterRange),
            _ => metric,
        })
        .collect()
}

/// Records that expose scoreable values
pub trait MetricSource {
    fn metric(&self, field: ScoreField) -> Option<f64>;
}

impl MetricSource for RaceRecord {
    fn metric(&self, field: ScoreField) -> Option<f64> {
        match field {
            ScoreField::AverageSpeed => Some(self.average_speed_kmh),
            ScoreField::EfficiencyFactor => self.efficiency_factor,
            ScoreField::KilojoulesPerHour => Some(self.kilojoules_per_hour),
            ScoreField::PowerToWeight => self.power_to_weight,
            ScoreField::Variability => self.variability,
            ScoreField::PowerHr => self.power_hr,
            ScoreField::MaxHeartRate => self.max_heart_rate,
            ScoreField::DistanceKm => Some(self.distance_km),
            ScoreField::MovingTimeMinutes => Some(self.moving_time_minutes),
        }
    }
}

impl MetricSource for MergedRecord {
    fn metric(&self, field: ScoreField) -> Option<f64> {
        self.race.metric(field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedValue {
    pub label: String,
    pub value: Option<f64>,
}

/// A record with its per-metric contributions and composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord<T> {
    pub record: T,
    /// One entry per metric, in metric order
    pub normalized: Vec<NormalizedValue>,
    pub performance_score: Option<f64>,
}

impl<T: AsRef<RaceRecord>> AsRef<RaceRecord> for ScoredRecord<T> {
    fn as_ref(&self) -> &RaceRecord {
        self.record.as_ref()
    }
}

/// Min-max normalize one column.
///
/// A degenerate range (no present values, or min equal to max) gives exactly 0
/// for every entry, including entries with a missing value.
pub fn normalize_column(values: &[Option<f64>], direction: Direction, null_policy: NullPolicy) -> Vec<Option<f64>> {
    let values: Vec<Option<f64>> = match null_policy {
        NullPolicy::ZeroBeforeRange => values.iter().map(|v| Some(v.unwrap_or(0.0))).collect(),
        NullPolicy::Propagate | NullPolicy::ZeroAfterRange => values.to_vec(),
    };

    let range = values.iter().flatten().fold(None, |acc: Option<(f64, f64)>, &v| match acc {
        None => Some((v, v)),
        Some((min, max)) => Some((min.min(v), max.max(v))),
    });

    let (min, max) = match range {
        Some((min, max)) if max > min => (min, max),
        _ => return vec![Some(0.0); values.len()],
    };

    values
        .iter()
        .map(|value| {
            let raw = match (value, null_policy) {
                (Some(v), _) => *v,
                (None, NullPolicy::ZeroAfterRange) => 0.0,
                (None, _) => return None,
            };
            let scaled = (raw - min) / (max - min);
            Some(match direction {
                Direction::HigherIsBetter => scaled,
                Direction::LowerIsBetter => 1.0 - scaled,
            })
        })
        .collect()
}

/// Scores cohorts against a fixed metric list
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    metrics: Vec<MetricSpec>,
}

impl ScoringEngine {
    pub fn new(metrics: Vec<MetricSpec>) -> Self {
        Self { metrics }
    }

    pub fn canonical() -> Self {
        Self::new(canonical_metrics())
    }

    pub fn metrics(&self) -> &[MetricSpec] {
        &self.metrics
    }

    /// Score every record against the cohort formed by all of them.
    ///
    /// Output order matches input order.
    pub fn score<T: MetricSource>(&self, records: Vec<T>) -> Vec<ScoredRecord<T>> {
        let columns: Vec<Vec<Option<f64>>> = self
            .metrics
            .iter()
            .map(|spec| {
                let raw: Vec<Option<f64>> = records.iter().map(|r| r.metric(spec.field)).collect();
                normalize_column(&raw, spec.direction, spec.null_policy)
            })
            .collect();

        records
            .into_iter()
            .enumerate()
            .map(|(row, record)| {
                let normalized: Vec<NormalizedValue> = self
                    .metrics
                    .iter()
                    .zip(&columns)
                    .map(|(spec, column)| NormalizedValue {
                        label: spec.label.clone(),
                        value: column[row],
                    })
                    .collect();
                let performance_score = normalized
                    .iter()
                    .map(|n| n.value)
                    .sum::<Option<f64>>();

                ScoredRecord {
                    record,
                    normalized,
                    performance_score,
                }
            })
            .collect()
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::canonical()
    }
}
