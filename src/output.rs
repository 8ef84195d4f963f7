// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Artifact Writer
//!
//! CSV tables with a header row and one row per entity. Missing values are
//! written as empty cells. Column names come from [`crate::constants::columns`]
//! and are read by downstream reporting tools.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::columns;
use crate::models::{DailyTelemetry, MergedRecord, RaceRecord, SessionStats};
use crate::scoring::{MetricSpec, ScoredRecord};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to prepare output directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Column sets that depend on configuration
#[derive(Debug, Clone, Default)]
pub struct TableLayout {
    pub wellness_windows: Vec<u32>,
    pub metric_labels: Vec<String>,
}

impl TableLayout {
    pub fn new(wellness_windows: &[u32], metrics: &[MetricSpec]) -> Self {
        Self {
            wellness_windows: wellness_windows.to_vec(),
            metric_labels: metrics.iter().map(|m| m.label.clone()).collect(),
        }
    }
}

/// A row type with a fixed header
pub trait Tabular {
    fn header(layout: &TableLayout) -> Vec<String>;
    fn row(&self, layout: &TableLayout) -> Vec<String>;
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

const TELEMETRY_VALUE_COLUMNS: [&str; 5] = [
    columns::TELEMETRY_MAX_POWER,
    columns::TELEMETRY_AVG_POWER,
    columns::TELEMETRY_MAX_HR,
    columns::TELEMETRY_AVG_HR,
    columns::TELEMETRY_DURATION,
];

impl Tabular for RaceRecord {
    fn header(layout: &TableLayout) -> Vec<String> {
        let mut header = names(&[
            columns::ACTIVITY_ID,
            columns::DATE,
            columns::NAME,
            columns::TYPE,
            columns::AVERAGE_SPEED,
            columns::KILOJOULES,
            columns::DISTANCE,
            columns::MOVING_TIME,
            columns::KILOJOULES_PER_HOUR,
            columns::MAX_HR,
            columns::VARIABILITY,
            columns::POWER_HR,
            columns::EFFICIENCY_FACTOR,
            columns::INCIDENT,
            columns::POWER_TO_WEIGHT,
        ]);
        for &days in &layout.wellness_windows {
            header.push(columns::avg_resting_hr(days));
            header.push(columns::avg_hrv(days));
            header.push(columns::avg_sleep(days));
        }
        header.extend(names(&[columns::CTL, columns::ATL, columns::RAMP_RATE]));
        header
    }

    fn row(&self, layout: &TableLayout) -> Vec<String> {
        let mut row = vec![
            self.activity_id.clone(),
            self.date.clone(),
            self.name.clone(),
            self.activity_type.clone(),
            self.average_speed_kmh.to_string(),
            cell(self.kilojoules),
            self.distance_km.to_string(),
            self.moving_time_minutes.to_string(),
            self.kilojoules_per_hour.to_string(),
            cell(self.max_heart_rate),
            cell(self.variability),
            cell(self.power_hr),
            cell(self.efficiency_factor),
            self.incident.clone().unwrap_or_default(),
            cell(self.power_to_weight),
        ];
        for &days in &layout.wellness_windows {
            let window = self.wellness.iter().find(|w| w.window_days == days);
            row.push(cell(window.and_then(|w| w.avg_resting_hr)));
            row.push(cell(window.and_then(|w| w.avg_hrv)));
            row.push(cell(window.and_then(|w| w.avg_sleep_hours)));
        }
        row.push(cell(self.training_load.ctl));
        row.push(cell(self.training_load.atl));
        row.push(cell(self.training_load.ramp_rate));
        row
    }
}

impl Tabular for SessionStats {
    fn header(_layout: &TableLayout) -> Vec<String> {
        let mut header = names(&[columns::DATE]);
        header.extend(names(&TELEMETRY_VALUE_COLUMNS));
        header.push(columns::TELEMETRY_FILENAME.to_string());
        header
    }

    fn row(&self, _layout: &TableLayout) -> Vec<String> {
        vec![
            self.date.clone(),
            self.max_power.to_string(),
            self.avg_power.to_string(),
            cell(self.max_hr),
            cell(self.avg_hr),
            self.duration_minutes.to_string(),
            self.filename.clone(),
        ]
    }
}

fn telemetry_cells(telemetry: Option<&DailyTelemetry>) -> Vec<String> {
    match telemetry {
        Some(day) => vec![
            day.max_power.to_string(),
            day.avg_power.to_string(),
            cell(day.max_hr),
            cell(day.avg_hr),
            day.duration_minutes.to_string(),
        ],
        None => vec![String::new(); TELEMETRY_VALUE_COLUMNS.len()],
    }
}

impl Tabular for DailyTelemetry {
    fn header(_layout: &TableLayout) -> Vec<String> {
        let mut header = names(&[columns::DATE]);
        header.extend(names(&TELEMETRY_VALUE_COLUMNS));
        header
    }

    fn row(&self, _layout: &TableLayout) -> Vec<String> {
        let mut row = vec![self.date.clone()];
        row.extend(telemetry_cells(Some(self)));
        row
    }
}

impl Tabular for MergedRecord {
    fn header(layout: &TableLayout) -> Vec<String> {
        let mut header = RaceRecord::header(layout);
        header.extend(names(&TELEMETRY_VALUE_COLUMNS));
        header
    }

    fn row(&self, layout: &TableLayout) -> Vec<String> {
        let mut row = self.race.row(layout);
        row.extend(telemetry_cells(self.telemetry.as_ref()));
        row
    }
}

impl<T: Tabular> Tabular for ScoredRecord<T> {
    fn header(layout: &TableLayout) -> Vec<String> {
        let mut header = T::header(layout);
        header.extend(layout.metric_labels.iter().map(|label| columns::normalized(label)));
        header.push(columns::PERFORMANCE_SCORE.to_string());
        header
    }

    fn row(&self, layout: &TableLayout) -> Vec<String> {
        let mut row = self.record.row(layout);
        row.extend(self.normalized.iter().map(|n| cell(n.value)));
        row.push(cell(self.performance_score));
        row
    }
}

/// Write `records` to `path`, replacing any existing file
pub fn write_table<T: Tabular>(path: &Path, layout: &TableLayout, records: &[T]) -> Result<(), OutputError> {
    let csv_error = |source: csv::Error| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(T::header(layout)).map_err(csv_error)?;
    for record in records {
        writer.write_record(record.row(layout)).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Create the output directory if needed
pub fn ensure_dir(dir: &Path) -> Result<(), OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
