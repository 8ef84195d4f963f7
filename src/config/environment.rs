// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based data source configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::constants::defaults;

/// Credentials and locations for one pipeline run
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Data source implementation (`intervals` or `memory`)
    pub provider: String,
    pub athlete_id: String,
    pub api_key: String,
    /// Override for the source's API root
    pub base_url: Option<String>,
    /// Directory the CSV artifacts are written to
    pub output_dir: PathBuf,
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("provider", &self.provider)
            .field("athlete_id", &self.athlete_id)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl SourceConfig {
    /// Load from environment variables, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        info!("Loading data source configuration from environment variables");

        if let Err(e) = dotenv::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let provider = env_var_or("RACE_PROVIDER", defaults::PROVIDER)?;
        let needs_credentials = provider != "memory";

        let config = SourceConfig {
            athlete_id: required_var("INTERVALS_ATHLETE_ID", needs_credentials)?,
            api_key: required_var("INTERVALS_API_KEY", needs_credentials)?,
            base_url: env::var("INTERVALS_BASE_URL").ok().filter(|url| !url.is_empty()),
            output_dir: PathBuf::from(env_var_or("RACE_OUTPUT_DIR", defaults::OUTPUT_DIR)?),
            provider,
        };

        config.validate()?;
        info!("Data source configuration loaded: {}", config.summary());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            url::Url::parse(base_url).context("Invalid INTERVALS_BASE_URL value")?;
        }
        if self.provider == "intervals" && (self.athlete_id.is_empty() || self.api_key.is_empty()) {
            return Err(anyhow::anyhow!("intervals provider requires an athlete id and an API key"));
        }
        Ok(())
    }

    /// One-line description without secrets
    pub fn summary(&self) -> String {
        format!(
            "provider={}, athlete={}, base_url={}, output_dir={}",
            self.provider,
            self.athlete_id,
            self.base_url.as_deref().unwrap_or("default"),
            self.output_dir.display()
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn required_var(key: &str, required: bool) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value),
        Err(_) if !required => Ok(String::new()),
        Err(_) => Err(anyhow::anyhow!("Missing required environment variable {}", key)),
    }
}
