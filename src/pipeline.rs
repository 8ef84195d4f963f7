// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Pipeline
//!
//! Runs the stages in order: activity fetch, race record building, telemetry
//! extraction and daily aggregation, merge, exclusion, scoring. Only the
//! activity fetch can fail the run; everything after it degrades to empty
//! cells or skipped files.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::cohort;
use crate::config::PipelineConfig;
use crate::constants::artifacts;
use crate::logging::PipelineLogger;
use crate::merge::left_join;
use crate::models::{DailyTelemetry, MergedRecord, RaceRecord, SessionStats};
use crate::output::{self, OutputError, TableLayout, Tabular};
use crate::providers::{ProviderError, RaceDataSource};
use crate::races::RaceRecordBuilder;
use crate::scoring::{ScoredRecord, ScoringEngine};
use crate::telemetry::{self, aggregate_by_date, BatchReport, TelemetryError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Activity source unavailable: {0}")]
    SourceUnavailable(#[source] ProviderError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Artifact(#[from] OutputError),
}

/// Everything one run produced
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub races: Vec<RaceRecord>,
    pub sessions: Vec<SessionStats>,
    pub daily: Vec<DailyTelemetry>,
    /// Every race, with telemetry where dates match
    pub merged: Vec<MergedRecord>,
    /// Merged records minus the excluded ids, in merge order
    pub scored: Vec<ScoredRecord<MergedRecord>>,
    pub skipped_files: usize,
}

pub struct Pipeline {
    source: Box<dyn RaceDataSource>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(source: Box<dyn RaceDataSource>, config: PipelineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> TableLayout {
        TableLayout::new(&self.config.wellness_windows, &self.config.scoring.metrics)
    }

    /// Layout of the outlier and pooled-race tables
    pub fn outlier_layout(&self) -> TableLayout {
        TableLayout::new(&self.config.wellness_windows, &self.config.scoring.outlier_metrics)
    }

    /// Race records for every race between the configured history start and
    /// `today`
    pub async fn fetch_race_records(&self, today: NaiveDate) -> Result<Vec<RaceRecord>, PipelineError> {
        let started = Instant::now();
        let provider = self.source.provider_name();

        let activities = match self.source.get_activities(self.config.history_start, today).await {
            Ok(activities) => activities,
            Err(e) => {
                PipelineLogger::log_source_request(provider, "activities", false, 0);
                return Err(PipelineError::SourceUnavailable(e));
            }
        };
        PipelineLogger::log_source_request(provider, "activities", true, activities.len());

        let races = RaceRecordBuilder::new(self.source.as_ref(), &self.config)
            .build(&activities)
            .await;
        PipelineLogger::log_stage("race_records", races.len(), started.elapsed().as_millis() as u64);
        Ok(races)
    }

    /// Full run. Without a telemetry directory every merged record has empty
    /// telemetry columns.
    pub async fn run(&self, telemetry_dir: Option<&Path>, today: NaiveDate) -> Result<PipelineOutput, PipelineError> {
        let races = self.fetch_race_records(today).await?;

        let report = match telemetry_dir {
            Some(dir) => extract_telemetry(dir).await?,
            None => BatchReport::default(),
        };
        let skipped_files = report.skipped.len();
        let sessions = report.into_sessions();

        let daily = aggregate_by_date(&sessions);
        PipelineLogger::log_stage("daily_telemetry", daily.len(), 0);

        let merged = left_join(races.clone(), &daily);
        let cohort = self.scoring_cohort(&merged);
        if cohort.len() < merged.len() {
            info!(excluded = merged.len() - cohort.len(), "Excluded activities before scoring");
        }

        let started = Instant::now();
        let scored = ScoringEngine::new(self.config.scoring.metrics.clone()).score(cohort);
        PipelineLogger::log_stage("scoring", scored.len(), started.elapsed().as_millis() as u64);

        Ok(PipelineOutput {
            races,
            sessions,
            daily,
            merged,
            scored,
            skipped_files,
        })
    }

    /// Merged records minus excluded ids, narrowed by the name filter
    fn scoring_cohort(&self, merged: &[MergedRecord]) -> Vec<MergedRecord> {
        let cohort = cohort::exclude_ids(merged.to_vec(), &self.config.excluded_activity_ids);
        match &self.config.name_contains {
            Some(needle) => cohort::name_contains(cohort, needle),
            None => cohort,
        }
    }

    /// Score the scoring cohort with the outlier metrics. Races missing
    /// power/weight can score below zero here.
    pub fn score_outlier_view(&self, merged: &[MergedRecord]) -> Vec<ScoredRecord<MergedRecord>> {
        ScoringEngine::new(self.config.scoring.outlier_metrics.clone()).score(self.scoring_cohort(merged))
    }

    /// Score only the configured pooled races without an incident, if any
    /// race names are configured
    pub fn score_pooled(&self, merged: &[MergedRecord]) -> Option<Vec<ScoredRecord<MergedRecord>>> {
        if self.config.pooled_race_names.is_empty() {
            return None;
        }
        let pooled = cohort::pool_by_name(merged.to_vec(), &self.config.pooled_race_names);
        let pooled = cohort::without_incidents(pooled);
        let pooled = cohort::exclude_ids(pooled, &self.config.excluded_activity_ids);
        Some(ScoringEngine::new(self.config.scoring.outlier_metrics.clone()).score(pooled))
    }

    /// Write the race, daily telemetry, merged and scored tables
    pub fn write_artifacts(&self, output: &PipelineOutput, dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        output::ensure_dir(dir)?;
        let layout = self.layout();

        Ok(vec![
            write(dir, artifacts::RACE_RECORDS, &layout, &output.races)?,
            write(dir, artifacts::DAILY_TELEMETRY, &layout, &output.daily)?,
            write(dir, artifacts::MERGED_RECORDS, &layout, &output.merged)?,
            write(dir, artifacts::SCORED_RECORDS, &layout, &output.scored)?,
        ])
    }
}

/// Discover and extract a directory of sessions on the blocking pool
pub async fn extract_telemetry(dir: &Path) -> Result<BatchReport, TelemetryError> {
    let dir = dir.to_path_buf();
    let report = tokio::task::spawn_blocking(move || {
        let files = telemetry::discover_sessions(&dir)?;
        telemetry::extract_batch(&files)
    })
    .await
    .map_err(|e| TelemetryError::WorkerPool(e.to_string()))??;

    PipelineLogger::log_telemetry_batch(
        report.sessions.len() + report.skipped.len(),
        report.sessions.len(),
        report.skipped.len(),
    );
    Ok(report)
}

/// Write one table under `dir`
pub fn write<T: Tabular>(dir: &Path, file_name: &str, layout: &TableLayout, rows: &[T]) -> Result<PathBuf, OutputError> {
    let path = dir.join(file_name);
    output::write_table(&path, layout, rows)?;
    PipelineLogger::log_artifact(&path.display().to_string(), rows.len());
    Ok(path)
}
