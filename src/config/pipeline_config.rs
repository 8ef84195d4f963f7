// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pipeline parameters: wellness windows, lookup offsets, exclusions and the
//! scored metric list

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::constants::defaults;
use crate::scoring::{canonical_metrics, outlier_metrics, MetricSpec};

/// Default file looked up in the working directory
pub const PIPELINE_CONFIG_FILE: &str = "pipeline_config.toml";

/// Main pipeline configuration structure
///
/// Every field has a default, so a file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pre-race wellness windows in days, in output column order
    pub wellness_windows: Vec<u32>,
    pub training_load_offset_days: i64,
    pub weight_search_radius_days: i64,
    /// First day of the activity history request
    pub history_start: NaiveDate,
    /// Activities dropped before scoring
    pub excluded_activity_ids: Vec<String>,
    /// Race names forming the pooled cohort, empty to skip pooling
    pub pooled_race_names: Vec<String>,
    /// Only score races whose name contains this text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
    /// Hand-curated incident notes keyed by activity id
    pub incidents: BTreeMap<String, String>,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Metrics behind `scored_records.csv`
    pub metrics: Vec<MetricSpec>,
    /// Metrics behind the outlier listing and the pooled-race table
    pub outlier_metrics: Vec<MetricSpec>,
}

impl PipelineConfig {
    /// Load from an explicit path, then `pipeline_config.toml`, then the user
    /// config directory, falling back to embedded defaults
    pub fn load(path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(&config_path);
        }

        if Path::new(PIPELINE_CONFIG_FILE).exists() {
            return Self::load_from_file(PIPELINE_CONFIG_FILE);
        }

        if let Some(user_path) = super::user_config_path() {
            if user_path.exists() {
                return Self::load_from_file(&user_path.to_string_lossy());
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path))?;

        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.wellness_windows.is_empty() {
            return Err(anyhow::anyhow!("wellness_windows cannot be empty"));
        }
        if self.wellness_windows.contains(&0) {
            return Err(anyhow::anyhow!("wellness_windows entries must be at least 1 day"));
        }
        if self.training_load_offset_days < 0 {
            return Err(anyhow::anyhow!("training_load_offset_days cannot be negative"));
        }
        if self.weight_search_radius_days < 0 {
            return Err(anyhow::anyhow!("weight_search_radius_days cannot be negative"));
        }
        validate_metrics("scoring.metrics", &self.scoring.metrics)?;
        validate_metrics("scoring.outlier_metrics", &self.scoring.outlier_metrics)?;
        Ok(())
    }

    /// Curated incident note for an activity
    pub fn incident(&self, activity_id: &str) -> Option<&str> {
        self.incidents.get(activity_id).map(String::as_str)
    }
}

fn validate_metrics(key: &str, metrics: &[MetricSpec]) -> Result<()> {
    if metrics.is_empty() {
        return Err(anyhow::anyhow!("{} cannot be empty", key));
    }

    let mut labels = HashSet::new();
    for metric in metrics {
        if !labels.insert(metric.label.as_str()) {
            return Err(anyhow::anyhow!("Duplicate label in {}: {}", key, metric.label));
        }
    }
    Ok(())
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            wellness_windows: defaults::WELLNESS_WINDOWS.to_vec(),
            training_load_offset_days: defaults::TRAINING_LOAD_OFFSET_DAYS,
            weight_search_radius_days: defaults::WEIGHT_SEARCH_RADIUS_DAYS,
            history_start: NaiveDate::parse_from_str(defaults::HISTORY_START, "%Y-%m-%d")
                .unwrap_or(NaiveDate::MIN),
            excluded_activity_ids: Vec::new(),
            pooled_race_names: Vec::new(),
            name_contains: None,
            incidents: BTreeMap::new(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            metrics: canonical_metrics(),
            outlier_metrics: outlier_metrics(),
        }
    }
}
