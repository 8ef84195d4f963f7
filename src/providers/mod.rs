// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Data sources for activity and wellness records

use async_trait::async_trait;
use anyhow::Result;
use chrono::NaiveDate;
use crate::config::SourceConfig;
use crate::models::{ActivityRecord, WellnessRecord};

pub mod intervals;
pub mod memory;

/// A source of activity and wellness records over arbitrary historical ranges.
///
/// Both ranges are inclusive on each end.
#[async_trait]
pub trait RaceDataSource: Send + Sync {
    async fn authenticate(&mut self, auth_data: AuthData) -> Result<(), ProviderError>;

    async fn get_activities(&self, oldest: NaiveDate, newest: NaiveDate) -> Result<Vec<ActivityRecord>, ProviderError>;

    async fn get_wellness(&self, oldest: NaiveDate, newest: NaiveDate) -> Result<Vec<WellnessRecord>, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub enum AuthData {
    /// Static API key for a single athlete
    ApiKey {
        athlete_id: String,
        api_key: String,
    },
    /// No credentials (offline sources)
    None,
}

/// Errors raised by data sources
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Unsupported authentication for {0}")]
    UnsupportedAuth(&'static str),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Create and authenticate a data source by name
pub async fn create_provider(provider_type: &str, config: &SourceConfig) -> Result<Box<dyn RaceDataSource>> {
    match provider_type.to_lowercase().as_str() {
        "intervals" => {
            let mut provider = match &config.base_url {
                Some(base_url) => intervals::IntervalsProvider::with_base_url(base_url),
                None => intervals::IntervalsProvider::new(),
            };
            provider.authenticate(AuthData::ApiKey {
                athlete_id: config.athlete_id.clone(),
                api_key: config.api_key.clone(),
            }).await?;
            Ok(Box::new(provider))
        }
        "memory" => Ok(Box::new(memory::InMemoryProvider::new(Vec::new(), Vec::new()))),
        _ => Err(anyhow::anyhow!("Unknown provider: {}. Currently supported: intervals, memory", provider_type)),
    }
}
