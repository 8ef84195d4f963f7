// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management for the race performance pipeline

pub mod environment;
pub mod pipeline_config;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub use environment::SourceConfig;
pub use pipeline_config::{PipelineConfig, ScoringConfig};

/// `<config dir>/race-performance/pipeline_config.toml`, if the platform has a
/// config directory
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("race-performance").join(pipeline_config::PIPELINE_CONFIG_FILE))
}

impl PipelineConfig {
    /// Write the configuration as TOML, creating parent directories
    pub fn save(&self, path: Option<String>) -> Result<()> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => user_config_path().context("No config directory on this platform")?,
        };

        if let Some(parent) = Path::new(&config_path).parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_save_and_reload() {
        let mut config = PipelineConfig::default();
        config.excluded_activity_ids = vec!["i83150165".to_string()];
        config.incidents.insert("i83150165".to_string(), "puncture".to_string());
        config.name_contains = Some("Road Race".to_string());

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("pipeline_config.toml");
        let config_path_str = config_path.to_string_lossy().to_string();

        config.save(Some(config_path_str.clone())).expect("Failed to save config");
        assert!(config_path.exists());

        let loaded = PipelineConfig::load(Some(config_path_str)).expect("Failed to load saved config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("nonexistent_config.toml");

        let result = PipelineConfig::load(Some(missing.to_string_lossy().to_string()));
        assert!(result.unwrap_err().to_string().contains("Failed to read pipeline config file"));
    }
}
