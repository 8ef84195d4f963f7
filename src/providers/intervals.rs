// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! intervals.icu data source.
//!
//! Reads the athlete's activity list and daily wellness entries through the
//! public REST API. Authentication is HTTP basic auth with the literal user
//! name `API_KEY` and the athlete's key as password.
//!
//! # API Documentation
//! - [intervals.icu API](https://intervals.icu/api/v1/docs/swagger-ui/index.html)

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::constants::api::{INTERVALS_API_BASE, INTERVALS_AUTH_USER, REQUEST_TIMEOUT_SECS};
use crate::models::{ActivityRecord, WellnessRecord};
use super::{AuthData, ProviderError, RaceDataSource};

pub struct IntervalsProvider {
    client: Client,
    base_url: String,
    athlete_id: Option<String>,
    api_key: Option<String>,
}

impl IntervalsProvider {
    pub fn new() -> Self {
        Self::with_base_url(INTERVALS_API_BASE)
    }

    /// Point the provider at another API root (mirrors, mock servers)
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            athlete_id: None,
            api_key: None,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        match (&self.athlete_id, &self.api_key) {
            (Some(athlete_id), Some(api_key)) => Ok((athlete_id.as_str(), api_key.as_str())),
            _ => Err(ProviderError::NotAuthenticated),
        }
    }

    /// Build `{base}/athlete/{id}/{resource}?oldest=..&newest=..`
    fn range_url(&self, athlete_id: &str, resource: &str, oldest: NaiveDate, newest: NaiveDate) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/athlete/{}/{}", self.base_url, athlete_id, resource))?;
        url.query_pairs_mut()
            .append_pair("oldest", &oldest.format("%Y-%m-%d").to_string())
            .append_pair("newest", &newest.format("%Y-%m-%d").to_string());
        Ok(url)
    }

    fn range_request(&self, url: Url, api_key: &str) -> RequestBuilder {
        self.client
            .get(url)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .basic_auth(INTERVALS_AUTH_USER, Some(api_key))
    }

    async fn fetch_range<T: DeserializeOwned>(&self, resource: &str, oldest: NaiveDate, newest: NaiveDate) -> Result<Vec<T>, ProviderError> {
        let (athlete_id, api_key) = self.credentials()?;
        let url = self.range_url(athlete_id, resource, oldest, newest)?;

        debug!(resource = %resource, oldest = %oldest, newest = %newest, "Requesting range");

        let response = self.range_request(url, api_key).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status: status.as_u16(), body });
        }

        Ok(response.json().await?)
    }
}

impl Default for IntervalsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RaceDataSource for IntervalsProvider {
    async fn authenticate(&mut self, auth_data: AuthData) -> Result<(), ProviderError> {
        match auth_data {
            AuthData::ApiKey { athlete_id, api_key } => {
                self.athlete_id = Some(athlete_id);
                self.api_key = Some(api_key);
                Ok(())
            }
            AuthData::None => Err(ProviderError::UnsupportedAuth("intervals.icu")),
        }
    }

    async fn get_activities(&self, oldest: NaiveDate, newest: NaiveDate) -> Result<Vec<ActivityRecord>, ProviderError> {
        self.fetch_range("activities", oldest, newest).await
    }

    async fn get_wellness(&self, oldest: NaiveDate, newest: NaiveDate) -> Result<Vec<WellnessRecord>, ProviderError> {
        self.fetch_range("wellness", oldest, newest).await
    }

    fn provider_name(&self) -> &'static str {
        "intervals.icu"
    }
}
