// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Left join of race records with daily telemetry on the date string

use std::collections::HashMap;

use crate::models::{DailyTelemetry, MergedRecord, RaceRecord};

/// Attach same-date telemetry to every race record.
///
/// Every race record is kept, in input order. Dates are expected to be unique
/// on the telemetry side; if one repeats, the last entry wins.
pub fn left_join(races: Vec<RaceRecord>, daily: &[DailyTelemetry]) -> Vec<MergedRecord> {
    let by_date: HashMap<&str, &DailyTelemetry> = daily.iter().map(|d| (d.date.as_str(), d)).collect();

    races
        .into_iter()
        .map(|race| {
            let telemetry = by_date.get(race.date.as_str()).map(|d| (*d).clone());
            MergedRecord { race, telemetry }
        })
        .collect()
}
