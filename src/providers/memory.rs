// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! In-memory data source for offline runs and tests

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Mutex;

use crate::models::{ActivityRecord, WellnessRecord};
use super::{AuthData, ProviderError, RaceDataSource};

/// Serves fixed records and keeps a log of wellness range requests
pub struct InMemoryProvider {
    activities: Vec<ActivityRecord>,
    wellness: Vec<WellnessRecord>,
    wellness_requests: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    fail_activities: bool,
    fail_wellness: bool,
}

impl InMemoryProvider {
    pub fn new(activities: Vec<ActivityRecord>, wellness: Vec<WellnessRecord>) -> Self {
        Self {
            activities,
            wellness,
            wellness_requests: Mutex::new(Vec::new()),
            fail_activities: false,
            fail_wellness: false,
        }
    }

    /// Make every activity request fail
    pub fn with_activity_failure(mut self) -> Self {
        self.fail_activities = true;
        self
    }

    /// Make every wellness request fail
    pub fn with_wellness_failure(mut self) -> Self {
        self.fail_wellness = true;
        self
    }

    /// Wellness ranges requested so far, in call order
    pub fn wellness_requests(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.wellness_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RaceDataSource for InMemoryProvider {
    async fn authenticate(&mut self, _auth_data: AuthData) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn get_activities(&self, oldest: NaiveDate, newest: NaiveDate) -> Result<Vec<ActivityRecord>, ProviderError> {
        if self.fail_activities {
            return Err(ProviderError::Unavailable("activity list offline".to_string()));
        }

        Ok(self.activities
            .iter()
            .filter(|a| a.race_date().map_or(true, |d| d >= oldest && d <= newest))
            .cloned()
            .collect())
    }

    async fn get_wellness(&self, oldest: NaiveDate, newest: NaiveDate) -> Result<Vec<WellnessRecord>, ProviderError> {
        if let Ok(mut requests) = self.wellness_requests.lock() {
            requests.push((oldest, newest));
        }

        if self.fail_wellness {
            return Err(ProviderError::Unavailable("wellness offline".to_string()));
        }

        Ok(self.wellness
            .iter()
            .filter(|w| w.date().is_some_and(|d| d >= oldest && d <= newest))
            .cloned()
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
