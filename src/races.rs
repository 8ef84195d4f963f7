// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Race record building.
//!
//! Turns race-flagged activities into [`RaceRecord`]s: unit conversions first,
//! then body weight, pre-race wellness windows and the training load snapshot
//! from the [`WellnessAggregator`]. Enrichment never drops a record; a lookup
//! that fails leaves its fields empty.

use chrono::Duration;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::models::{round_to, ActivityRecord, RaceRecord, TrainingLoadSnapshot};
use crate::providers::RaceDataSource;
use crate::wellness::WellnessAggregator;

pub struct RaceRecordBuilder<'a> {
    wellness: WellnessAggregator<'a>,
    config: &'a PipelineConfig,
}

impl<'a> RaceRecordBuilder<'a> {
    pub fn new(source: &'a dyn RaceDataSource, config: &'a PipelineConfig) -> Self {
        Self {
            wellness: WellnessAggregator::new(source).with_weight_radius(config.weight_search_radius_days),
            config,
        }
    }

    /// Build one record per race activity, ordered by activity id
    pub async fn build(&self, activities: &[ActivityRecord]) -> Vec<RaceRecord> {
        let mut races: Vec<&ActivityRecord> = activities.iter().filter(|a| a.is_race()).collect();
        races.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(activities = activities.len(), races = races.len(), "Selected race activities");

        let mut records = Vec::with_capacity(races.len());
        for activity in races {
            records.push(self.build_one(activity).await);
        }
        records
    }

    pub async fn build_one(&self, activity: &ActivityRecord) -> RaceRecord {
        let mut record = base_record(activity);
        record.incident = self.config.incident(&activity.id).map(str::to_string);

        let Some(race_date) = activity.race_date() else {
            warn!(
                activity_id = %activity.id,
                start_date_local = %activity.start_date_local,
                "Race date unparseable, skipping enrichment"
            );
            return record;
        };

        let weight = self.wellness.resolve_weight(race_date).await;
        record.power_to_weight = power_to_weight(activity.weighted_avg_power, weight);

        for &window_days in &self.config.wellness_windows {
            record
                .wellness
                .push(self.wellness.average_window(race_date, window_days).await);
        }

        let load_date = race_date - Duration::days(self.config.training_load_offset_days);
        record.training_load = self.wellness.snapshot_training_load(load_date).await;

        record
    }
}

/// Descriptive fields and unit conversions, without any lookups
pub fn base_record(activity: &ActivityRecord) -> RaceRecord {
    let moving_time = activity.moving_time.unwrap_or(0.0);
    // An absent moving time divides the energy by one second
    let rate_seconds = activity.moving_time.unwrap_or(1.0);
    let kilojoules_per_hour = if rate_seconds > 0.0 {
        round_to(activity.energy_kj.unwrap_or(0.0) / (rate_seconds / 3600.0), 2)
    } else {
        0.0
    };

    RaceRecord {
        activity_id: activity.id.clone(),
        date: activity.date_key().to_string(),
        name: activity.name.clone(),
        activity_type: activity.activity_type.clone(),
        average_speed_kmh: round_to(activity.average_speed.unwrap_or(0.0) * 3.6, 2),
        kilojoules: activity.energy_kj,
        distance_km: round_to(activity.distance.unwrap_or(0.0) / 1000.0, 2),
        moving_time_minutes: round_to(moving_time / 60.0, 2),
        kilojoules_per_hour,
        max_heart_rate: activity.max_heart_rate,
        variability: activity.variability_index,
        power_hr: activity.power_hr,
        efficiency_factor: activity.efficiency_factor,
        incident: None,
        power_to_weight: None,
        wellness: Vec::new(),
        training_load: TrainingLoadSnapshot::default(),
    }
}

/// Weighted power over body weight; zero readings count as missing
pub fn power_to_weight(weighted_avg_power: Option<f64>, weight: Option<f64>) -> Option<f64> {
    match (weighted_avg_power, weight) {
        (Some(power), Some(weight)) if power != 0.0 && weight != 0.0 => Some(round_to(power / weight, 2)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WellnessRecord;
    use crate::providers::memory::InMemoryProvider;

    fn activity(id: &str, start: &str, race: Option<bool>) -> ActivityRecord {
        ActivityRecord {
            id: id.to_string(),
            start_date_local: start.to_string(),
            name: "Chichibu Road Race".to_string(),
            activity_type: "Ride".to_string(),
            race,
            distance: Some(62_340.0),
            moving_time: Some(6000.0),
            average_speed: Some(10.39),
            energy_kj: Some(1450.0),
            max_heart_rate: Some(188.0),
            variability_index: Some(1.08),
            power_hr: Some(1.62),
            efficiency_factor: Some(1.55),
            weighted_avg_power: Some(262.0),
        }
    }

    fn wellness(date: &str) -> WellnessRecord {
        WellnessRecord {
            id: date.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unit_conversions_round_to_two_places() {
        let record = base_record(&activity("i1", "2024-09-08T08:30:00", Some(true)));

        assert_eq!(record.date, "2024-09-08");
        assert_eq!(record.average_speed_kmh, 37.4);
        assert_eq!(record.distance_km, 62.34);
        assert_eq!(record.moving_time_minutes, 100.0);
        assert_eq!(record.kilojoules_per_hour, 870.0);
        assert_eq!(record.kilojoules, Some(1450.0));
        assert_eq!(record.incident, None);
    }

    #[test]
    fn test_energy_rate_without_moving_time() {
        let record = base_record(&ActivityRecord {
            moving_time: Some(0.0),
            ..activity("i1", "2024-09-08T08:30:00", Some(true))
        });
        assert_eq!(record.kilojoules_per_hour, 0.0);

        let record = base_record(&ActivityRecord {
            moving_time: None,
            average_speed: None,
            distance: None,
            energy_kj: Some(2.0),
            ..activity("i1", "2024-09-08T08:30:00", Some(true))
        });
        assert_eq!(record.kilojoules_per_hour, 7200.0);
        assert_eq!(record.moving_time_minutes, 0.0);
        assert_eq!(record.average_speed_kmh, 0.0);
        assert_eq!(record.distance_km, 0.0);
    }

    #[test]
    fn test_power_to_weight_requires_both_values() {
        assert_eq!(power_to_weight(Some(262.0), Some(63.4)), Some(4.13));
        assert_eq!(power_to_weight(None, Some(63.4)), None);
        assert_eq!(power_to_weight(Some(262.0), None), None);
        assert_eq!(power_to_weight(Some(262.0), Some(0.0)), None);
        assert_eq!(power_to_weight(Some(0.0), Some(63.4)), None);
    }

    #[tokio::test]
    async fn test_build_filters_and_orders_races() {
        let provider = InMemoryProvider::new(Vec::new(), Vec::new());
        let config = PipelineConfig::default();
        let builder = RaceRecordBuilder::new(&provider, &config);

        let records = builder
            .build(&[
                activity("i300", "2024-09-08T08:30:00", Some(true)),
                activity("i200", "2024-09-01T08:30:00", Some(false)),
                activity("i100", "2024-08-25T08:30:00", Some(true)),
                activity("i250", "2024-08-26T08:30:00", None),
            ])
            .await;

        let ids: Vec<&str> = records.iter().map(|r| r.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["i100", "i300"]);
    }

    #[tokio::test]
    async fn test_enrichment_from_wellness() {
        let provider = InMemoryProvider::new(
            Vec::new(),
            vec![
                WellnessRecord { resting_hr: Some(46.0), hrv: Some(70.0), sleep_secs: Some(27000.0), ..wellness("2024-09-02") },
                WellnessRecord { resting_hr: Some(50.0), ctl: Some(71.2), atl: Some(84.5), ramp_rate: Some(1.8), ..wellness("2024-09-07") },
                WellnessRecord { weight: Some(62.0), ..wellness("2024-09-12") },
                WellnessRecord { resting_hr: Some(60.0), ..wellness("2024-08-20") },
            ],
        );
        let config = PipelineConfig::default();
        let builder = RaceRecordBuilder::new(&provider, &config);

        let record = builder.build_one(&activity("i1", "2024-09-08T08:30:00", Some(true))).await;

        assert_eq!(record.power_to_weight, Some(4.23));
        assert_eq!(record.wellness.len(), 2);
        assert_eq!(record.wellness[0].window_days, 7);
        assert_eq!(record.wellness[0].avg_resting_hr, Some(48.0));
        assert_eq!(record.wellness[0].avg_sleep_hours, Some(7.5));
        assert_eq!(record.wellness[1].window_days, 14);
        assert_eq!(record.wellness[1].avg_resting_hr, Some(48.0));
        assert_eq!(record.training_load.ctl, Some(71.2));
        assert_eq!(record.training_load.atl, Some(84.5));
        assert_eq!(record.training_load.ramp_rate, Some(1.8));
    }

    #[tokio::test]
    async fn test_failed_wellness_keeps_record() {
        let provider = InMemoryProvider::new(Vec::new(), vec![wellness("2024-09-08")]).with_wellness_failure();
        let config = PipelineConfig::default();
        let builder = RaceRecordBuilder::new(&provider, &config);

        let records = builder.build(&[activity("i1", "2024-09-08T08:30:00", Some(true))]).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].power_to_weight, None);
        assert_eq!(records[0].average_speed_kmh, 37.4);
        assert!(records[0].wellness.iter().all(|w| w.avg_hrv.is_none()));
        assert_eq!(records[0].training_load, TrainingLoadSnapshot::default());
    }

    #[tokio::test]
    async fn test_curated_incident_passes_through() {
        let provider = InMemoryProvider::new(Vec::new(), Vec::new());
        let mut config = PipelineConfig::default();
        config.incidents.insert("i300".to_string(), "puncture at km 40".to_string());
        let builder = RaceRecordBuilder::new(&provider, &config);

        let records = builder
            .build(&[
                activity("i300", "2024-09-08T08:30:00", Some(true)),
                activity("i100", "not a date", Some(true)),
            ])
            .await;

        assert_eq!(records[0].incident, None);
        assert_eq!(records[1].activity_id, "i300");
        assert_eq!(records[1].incident.as_deref(), Some("puncture at km 40"));
    }

    #[tokio::test]
    async fn test_unparseable_date_skips_lookups() {
        let provider = InMemoryProvider::new(Vec::new(), Vec::new());
        let config = PipelineConfig::default();
        let builder = RaceRecordBuilder::new(&provider, &config);

        let record = builder.build_one(&activity("i1", "yesterday", Some(true))).await;

        assert_eq!(record.date, "yesterday");
        assert!(record.wellness.is_empty());
        assert!(provider.wellness_requests().is_empty());
    }
}
