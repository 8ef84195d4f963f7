// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Records flowing through the race performance pipeline, leaves first:
//!
//! - [`ActivityRecord`] and [`WellnessRecord`]: raw records as returned by a
//!   [`RaceDataSource`](crate::providers::RaceDataSource)
//! - [`RaceRecord`]: one enriched, denormalized row per race activity
//! - [`SessionStats`] and [`DailyTelemetry`]: telemetry reduced per file and per day
//! - [`MergedRecord`]: a race record left-joined with same-day telemetry
//!
//! Every stage owns the type it emits. Downstream stages only append fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single activity as reported by the data source
///
/// Field names on the wire follow the intervals.icu vocabulary. Everything except
/// the identifier and start time is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityRecord {
    /// Unique identifier (e.g. `i49131928`)
    pub id: String,
    /// Local start date-time, ISO formatted
    pub start_date_local: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    /// Race flag set by the athlete
    #[serde(default)]
    pub race: Option<bool>,
    /// Distance in meters
    #[serde(default)]
    pub distance: Option<f64>,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: Option<f64>,
    /// Average speed in m/s
    #[serde(default)]
    pub average_speed: Option<f64>,
    /// Energy in kilojoules
    #[serde(rename = "icu_joules", default)]
    pub energy_kj: Option<f64>,
    #[serde(rename = "max_heartrate", default)]
    pub max_heart_rate: Option<f64>,
    #[serde(rename = "icu_variability_index", default)]
    pub variability_index: Option<f64>,
    #[serde(rename = "icu_power_hr", default)]
    pub power_hr: Option<f64>,
    #[serde(rename = "icu_efficiency_factor", default)]
    pub efficiency_factor: Option<f64>,
    #[serde(rename = "icu_weighted_avg_watts", default)]
    pub weighted_avg_power: Option<f64>,
}

impl ActivityRecord {
    /// Whether the activity is flagged as a race
    pub fn is_race(&self) -> bool {
        self.race == Some(true)
    }

    /// Calendar date part of the local start time (`YYYY-MM-DD`)
    pub fn date_key(&self) -> &str {
        self.start_date_local
            .split('T')
            .next()
            .unwrap_or(&self.start_date_local)
    }

    /// Parsed calendar date, `None` if the start time is not ISO formatted
    pub fn race_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date_key(), "%Y-%m-%d").ok()
    }
}

/// Daily wellness entry, keyed by calendar date
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WellnessRecord {
    /// Calendar date (`YYYY-MM-DD`)
    pub id: String,
    #[serde(rename = "restingHR", default)]
    pub resting_hr: Option<f64>,
    #[serde(default)]
    pub hrv: Option<f64>,
    #[serde(rename = "sleepSecs", default)]
    pub sleep_secs: Option<f64>,
    /// Body weight in kg
    #[serde(default)]
    pub weight: Option<f64>,
    /// Chronic training load (fitness)
    #[serde(default)]
    pub ctl: Option<f64>,
    /// Acute training load (fatigue)
    #[serde(default)]
    pub atl: Option<f64>,
    #[serde(rename = "rampRate", default)]
    pub ramp_rate: Option<f64>,
}

impl WellnessRecord {
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.id, "%Y-%m-%d").ok()
    }
}

/// Mean wellness values over a pre-race window
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WindowAverages {
    pub window_days: u32,
    pub avg_resting_hr: Option<f64>,
    pub avg_hrv: Option<f64>,
    pub avg_sleep_hours: Option<f64>,
}

/// Training load values at a single date
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrainingLoadSnapshot {
    pub ctl: Option<f64>,
    pub atl: Option<f64>,
    pub ramp_rate: Option<f64>,
}

/// One race activity enriched with pre-race context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaceRecord {
    pub activity_id: String,
    /// Race date (`YYYY-MM-DD`), also the join key for telemetry
    pub date: String,
    pub name: String,
    pub activity_type: String,
    pub average_speed_kmh: f64,
    pub kilojoules: Option<f64>,
    pub distance_km: f64,
    pub moving_time_minutes: f64,
    /// Energy rate, 0 when moving time is not positive; an absent moving time counts as one second
    pub kilojoules_per_hour: f64,
    pub max_heart_rate: Option<f64>,
    pub variability: Option<f64>,
    pub power_hr: Option<f64>,
    pub efficiency_factor: Option<f64>,
    /// Hand-curated note from `PipelineConfig::incidents`, copied unchanged
    pub incident: Option<String>,
    pub power_to_weight: Option<f64>,
    /// One entry per configured window, in configuration order
    pub wellness: Vec<WindowAverages>,
    /// Snapshot taken the configured number of days before the race
    pub training_load: TrainingLoadSnapshot,
}

impl AsRef<RaceRecord> for RaceRecord {
    fn as_ref(&self) -> &RaceRecord {
        self
    }
}

/// Statistics reduced from one telemetry file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub date: String,
    pub max_power: f64,
    pub avg_power: f64,
    pub max_hr: Option<f64>,
    pub avg_hr: Option<f64>,
    pub duration_minutes: f64,
    pub filename: String,
}

/// All telemetry sessions of one calendar date folded together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyTelemetry {
    pub date: String,
    /// Highest max power of the day
    pub max_power: f64,
    /// Mean of the per-session averages
    pub avg_power: f64,
    pub max_hr: Option<f64>,
    pub avg_hr: Option<f64>,
    /// Total duration of the day's sessions
    pub duration_minutes: f64,
    pub session_count: usize,
}

/// Race record with same-date telemetry, if any
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedRecord {
    #[serde(flatten)]
    pub race: RaceRecord,
    pub telemetry: Option<DailyTelemetry>,
}

impl AsRef<RaceRecord> for MergedRecord {
    fn as_ref(&self) -> &RaceRecord {
        &self.race
    }
}

/// Round half away from zero to the given number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
