// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end pipeline runs over an in-memory source and TCX files on disk

use anyhow::Result;
use chrono::NaiveDate;
use race_performance::config::PipelineConfig;
use race_performance::models::{ActivityRecord, WellnessRecord};
use race_performance::pipeline::{extract_telemetry, Pipeline};
use race_performance::providers::memory::InMemoryProvider;
use race_performance::telemetry::SkipReason;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

/// Race with every scored metric except speed held constant
fn race(id: &str, date: &str, speed_kmh: f64) -> ActivityRecord {
    ActivityRecord {
        id: id.to_string(),
        start_date_local: format!("{}T09:00:00", date),
        name: "Kanto Series".to_string(),
        activity_type: "Ride".to_string(),
        race: Some(true),
        distance: Some(50_000.0),
        moving_time: Some(5400.0),
        average_speed: Some(speed_kmh / 3.6),
        energy_kj: Some(1200.0),
        max_heart_rate: Some(186.0),
        variability_index: Some(1.05),
        power_hr: Some(1.6),
        efficiency_factor: Some(1.5),
        weighted_avg_power: Some(250.0),
    }
}

fn weight(date: &str, kg: f64) -> WellnessRecord {
    WellnessRecord {
        id: date.to_string(),
        weight: Some(kg),
        ..Default::default()
    }
}

fn tcx(session_id: &str, points: &[(&str, Option<u32>, Option<u32>)]) -> String {
    let trackpoints: String = points
        .iter()
        .map(|(time, watts, hr)| {
            let hr = hr
                .map(|v| format!("<HeartRateBpm><Value>{}</Value></HeartRateBpm>", v))
                .unwrap_or_default();
            let watts = watts
                .map(|v| format!("<Extensions><ns3:TPX><ns3:Watts>{}</ns3:Watts></ns3:TPX></Extensions>", v))
                .unwrap_or_default();
            format!("<Trackpoint><Time>{}</Time>{}{}</Trackpoint>", time, hr, watts)
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2"
    xmlns:ns3="http://www.garmin.com/xmlschemas/ActivityExtension/v2">
  <Activities><Activity Sport="Biking"><Id>{}</Id><Lap><Track>{}</Track></Lap></Activity></Activities>
</TrainingCenterDatabase>"#,
        session_id, trackpoints
    )
}

fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("Failed to write telemetry file");
}

#[tokio::test]
async fn test_speed_only_cohort_scores() -> Result<()> {
    let provider = InMemoryProvider::new(
        vec![
            race("i3", "2024-09-22", 40.0),
            race("i1", "2024-09-08", 30.0),
            race("i2", "2024-09-15", 35.0),
        ],
        vec![weight("2024-09-08", 62.5), weight("2024-09-15", 62.5), weight("2024-09-22", 62.5)],
    );
    let pipeline = Pipeline::new(Box::new(provider), PipelineConfig::default());

    let output = pipeline.run(None, today()).await?;

    let ids: Vec<&str> = output.scored.iter().map(|s| s.record.race.activity_id.as_str()).collect();
    assert_eq!(ids, vec!["i1", "i2", "i3"]);

    let speed: Vec<Option<f64>> = output.scored.iter().map(|s| s.normalized[0].value).collect();
    assert_eq!(speed, vec![Some(0.0), Some(0.5), Some(1.0)]);

    let scores: Vec<Option<f64>> = output.scored.iter().map(|s| s.performance_score).collect();
    assert_eq!(scores, vec![Some(0.0), Some(0.5), Some(1.0)]);
    Ok(())
}

#[tokio::test]
async fn test_telemetry_joins_on_race_date() -> Result<()> {
    let telemetry_dir = TempDir::new()?;
    write_file(
        telemetry_dir.path(),
        "race_morning.tcx",
        &tcx(
            "2024-09-08T09:00:00Z",
            &[
                ("2024-09-08T09:00:00Z", Some(280), Some(150)),
                ("2024-09-08T09:45:00Z", Some(300), Some(170)),
            ],
        ),
    );
    write_file(
        telemetry_dir.path(),
        "race_cooldown.tcx",
        &tcx(
            "2024-09-08T11:00:00Z",
            &[
                ("2024-09-08T11:00:00Z", Some(120), None),
                ("2024-09-08T11:40:00Z", Some(140), None),
            ],
        ),
    );
    write_file(
        telemetry_dir.path(),
        "hr_only.tcx",
        &tcx("2024-09-15T09:00:00Z", &[("2024-09-15T09:00:00Z", None, Some(140))]),
    );
    write_file(telemetry_dir.path(), "broken.tcx", "<TrainingCenterDatabase><Activities>");
    write_file(telemetry_dir.path(), "notes.txt", "not telemetry");

    let provider = InMemoryProvider::new(
        vec![race("i1", "2024-09-08", 36.0), race("i2", "2024-09-15", 38.0)],
        Vec::new(),
    );
    let pipeline = Pipeline::new(Box::new(provider), PipelineConfig::default());

    let output = pipeline.run(Some(telemetry_dir.path()), today()).await?;

    assert_eq!(output.sessions.len(), 2);
    assert_eq!(output.skipped_files, 2);
    assert_eq!(output.daily.len(), 1);

    let day = &output.daily[0];
    assert_eq!(day.date, "2024-09-08");
    assert_eq!(day.max_power, 300.0);
    assert_eq!(day.avg_power, 210.0);
    assert_eq!(day.max_hr, Some(170.0));
    assert_eq!(day.avg_hr, Some(160.0));
    assert_eq!(day.duration_minutes, 85.0);

    assert_eq!(output.merged.len(), 2);
    assert_eq!(output.merged[0].telemetry.as_ref().map(|t| t.max_power), Some(300.0));
    assert!(output.merged[1].telemetry.is_none());
    assert_eq!(output.merged[1].race.average_speed_kmh, 38.0);
    Ok(())
}

#[tokio::test]
async fn test_skip_reasons_are_reported() -> Result<()> {
    let telemetry_dir = TempDir::new()?;
    write_file(
        telemetry_dir.path(),
        "hr_only.tcx",
        &tcx("2024-09-15T09:00:00Z", &[("2024-09-15T09:00:00Z", None, Some(140))]),
    );
    write_file(
        telemetry_dir.path(),
        "course.tcx",
        "<TrainingCenterDatabase><Courses><Course><Name>Loop</Name></Course></Courses></TrainingCenterDatabase>",
    );

    let report = extract_telemetry(telemetry_dir.path()).await?;

    assert!(report.sessions.is_empty());
    let mut reasons: Vec<(String, SkipReason)> = report
        .skipped
        .iter()
        .map(|s| (s.path.file_name().unwrap().to_string_lossy().to_string(), s.reason.clone()))
        .collect();
    reasons.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        reasons,
        vec![
            ("course.tcx".to_string(), SkipReason::NoActivity),
            ("hr_only.tcx".to_string(), SkipReason::NoPowerSamples),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_telemetry_directory_fails() {
    let provider = InMemoryProvider::new(vec![race("i1", "2024-09-08", 36.0)], Vec::new());
    let pipeline = Pipeline::new(Box::new(provider), PipelineConfig::default());

    let result = pipeline.run(Some(Path::new("/nonexistent/telemetry")), today()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_artifacts_written_with_stable_headers() -> Result<()> {
    let out_dir = TempDir::new()?;
    let provider = InMemoryProvider::new(
        vec![race("i1", "2024-09-08", 36.0), race("i2", "2024-09-15", 38.0)],
        vec![weight("2024-09-08", 62.5)],
    );
    let mut config = PipelineConfig::default();
    config.excluded_activity_ids = vec!["i2".to_string()];
    let pipeline = Pipeline::new(Box::new(provider), config);

    let output = pipeline.run(None, today()).await?;
    let written = pipeline.write_artifacts(&output, &out_dir.path().join("artifacts"))?;
    assert_eq!(written.len(), 4);

    let races = fs::read_to_string(out_dir.path().join("artifacts/race_records.csv"))?;
    let mut lines = races.lines();
    assert!(lines.next().unwrap_or_default().starts_with("Activity ID,Date,Name,Type,Average Speed (km/h)"));
    assert_eq!(lines.count(), 2);

    let scored = fs::read_to_string(out_dir.path().join("artifacts/scored_records.csv"))?;
    let header = scored.lines().next().unwrap_or_default();
    assert!(header.contains("Xert_Max_Power"));
    assert!(header.ends_with("Normalized Power/Weight,Performance Score"));
    assert_eq!(scored.lines().count(), 2);

    let daily = fs::read_to_string(out_dir.path().join("artifacts/daily_telemetry.csv"))?;
    assert_eq!(daily.lines().count(), 1);
    Ok(())
}
