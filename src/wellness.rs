// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Wellness window aggregation.
//!
//! Reduces daily wellness entries into pre-race summaries. A failed wellness
//! request is logged and treated as a day range without data: every lookup
//! here resolves to `None` rather than an error.

use chrono::{Duration, NaiveDate};
use tracing::warn;

use crate::constants::defaults::WEIGHT_SEARCH_RADIUS_DAYS;
use crate::models::{round_to, TrainingLoadSnapshot, WellnessRecord, WindowAverages};
use crate::providers::RaceDataSource;

pub struct WellnessAggregator<'a> {
    source: &'a dyn RaceDataSource,
    weight_search_radius_days: i64,
}

impl<'a> WellnessAggregator<'a> {
    pub fn new(source: &'a dyn RaceDataSource) -> Self {
        Self {
            source,
            weight_search_radius_days: WEIGHT_SEARCH_RADIUS_DAYS,
        }
    }

    pub fn with_weight_radius(mut self, days: i64) -> Self {
        self.weight_search_radius_days = days;
        self
    }

    async fn fetch(&self, oldest: NaiveDate, newest: NaiveDate) -> Vec<WellnessRecord> {
        match self.source.get_wellness(oldest, newest).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    provider = %self.source.provider_name(),
                    oldest = %oldest,
                    newest = %newest,
                    error = %e,
                    "Wellness lookup failed, treating range as empty"
                );
                Vec::new()
            }
        }
    }

    /// Average resting HR, HRV and sleep over `[target - window_days, target]`
    pub async fn average_window(&self, target: NaiveDate, window_days: u32) -> WindowAverages {
        let oldest = target - Duration::days(i64::from(window_days));
        let records = self.fetch(oldest, target).await;
        summarize_window(&records, window_days)
    }

    /// CTL, ATL and ramp rate recorded on exactly `target`
    pub async fn snapshot_training_load(&self, target: NaiveDate) -> TrainingLoadSnapshot {
        let records = self.fetch(target, target).await;
        match records.first() {
            Some(record) => TrainingLoadSnapshot {
                ctl: record.ctl,
                atl: record.atl,
                ramp_rate: record.ramp_rate,
            },
            None => TrainingLoadSnapshot::default(),
        }
    }

    /// Body weight on `target`, falling back to the closest reading within the
    /// search radius
    pub async fn resolve_weight(&self, target: NaiveDate) -> Option<f64> {
        let exact = self.fetch(target, target).await;
        if let Some(weight) = exact.first().and_then(|r| present(r.weight)) {
            return Some(weight);
        }

        let radius = Duration::days(self.weight_search_radius_days);
        let nearby = self.fetch(target - radius, target + radius).await;
        closest_weight(nearby, target)
    }
}

/// Zero readings are not measurements; the source reports missing values as 0
/// for some devices.
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Per-metric means, each metric filtered independently
pub fn summarize_window(records: &[WellnessRecord], window_days: u32) -> WindowAverages {
    let resting_hrs: Vec<f64> = records.iter().filter_map(|r| present(r.resting_hr)).collect();
    let hrvs: Vec<f64> = records.iter().filter_map(|r| present(r.hrv)).collect();
    let sleeps: Vec<f64> = records.iter().filter_map(|r| present(r.sleep_secs)).collect();

    WindowAverages {
        window_days,
        avg_resting_hr: mean(&resting_hrs).map(|v| round_to(v, 2)),
        avg_hrv: mean(&hrvs).map(|v| round_to(v, 2)),
        avg_sleep_hours: mean(&sleeps).map(|v| round_to(v / 3600.0, 2)),
    }
}

/// First weight by ascending day distance to `target`; ties keep source order
pub fn closest_weight(mut records: Vec<WellnessRecord>, target: NaiveDate) -> Option<f64> {
    records.sort_by_key(|r| {
        r.date()
            .map(|d| (d - target).num_days().abs())
            .unwrap_or(i64::MAX)
    });

    records.iter().find_map(|r| present(r.weight))
}
