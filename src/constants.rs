// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Fixed values shared across the pipeline: data source endpoints, default
//! windows and the column names of the persisted tables.

/// Data source endpoints
pub mod api {
    pub const INTERVALS_API_BASE: &str = "https://intervals.icu/api/v1";

    /// Basic auth user name expected by intervals.icu for key-based access
    pub const INTERVALS_AUTH_USER: &str = "API_KEY";

    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Default pipeline parameters
pub mod defaults {
    /// Pre-race wellness windows in days
    pub const WELLNESS_WINDOWS: [u32; 2] = [7, 14];

    /// Training load is read this many days before the race
    pub const TRAINING_LOAD_OFFSET_DAYS: i64 = 1;

    /// Half-width of the fallback search for a body weight reading
    pub const WEIGHT_SEARCH_RADIUS_DAYS: i64 = 30;

    /// First day of the activity history request
    pub const HISTORY_START: &str = "2000-01-01";

    pub const OUTPUT_DIR: &str = ".";

    pub const PROVIDER: &str = "intervals";
}

/// Persisted artifact file names
pub mod artifacts {
    pub const RACE_RECORDS: &str = "race_records.csv";
    pub const SESSION_TELEMETRY: &str = "session_telemetry.csv";
    pub const DAILY_TELEMETRY: &str = "daily_telemetry.csv";
    pub const MERGED_RECORDS: &str = "merged_records.csv";
    pub const SCORED_RECORDS: &str = "scored_records.csv";
    pub const POOLED_SCORED_RECORDS: &str = "pooled_scored_records.csv";
}

/// Column names read by downstream reporting tools. Renaming any of them breaks
/// those tools.
pub mod columns {
    pub const ACTIVITY_ID: &str = "Activity ID";
    pub const DATE: &str = "Date";
    pub const NAME: &str = "Name";
    pub const TYPE: &str = "Type";
    pub const AVERAGE_SPEED: &str = "Average Speed (km/h)";
    pub const KILOJOULES: &str = "Kilojoules";
    pub const DISTANCE: &str = "Distance (km)";
    pub const MOVING_TIME: &str = "Moving Time (minutes)";
    pub const KILOJOULES_PER_HOUR: &str = "Kilojoules/Hour";
    pub const MAX_HR: &str = "Max HR (in-race)";
    pub const VARIABILITY: &str = "Variability";
    pub const POWER_HR: &str = "Power/HR";
    pub const EFFICIENCY_FACTOR: &str = "Efficiency Factor";
    pub const INCIDENT: &str = "Incident";
    pub const POWER_TO_WEIGHT: &str = "Power/Weight (W/kg)";
    pub const CTL: &str = "Fitness (CTL, day pre-race)";
    pub const ATL: &str = "Fatigue (ATL, day pre-race)";
    pub const RAMP_RATE: &str = "Form (Ramp Rate, day pre-race)";

    pub const TELEMETRY_MAX_POWER: &str = "Xert_Max_Power";
    pub const TELEMETRY_AVG_POWER: &str = "Xert_Avg_Power";
    pub const TELEMETRY_MAX_HR: &str = "Xert_Max_HR";
    pub const TELEMETRY_AVG_HR: &str = "Xert_Avg_HR";
    pub const TELEMETRY_DURATION: &str = "Xert_Duration_Min";
    pub const TELEMETRY_FILENAME: &str = "Xert_Filename";

    pub const PERFORMANCE_SCORE: &str = "Performance Score";

    pub fn avg_resting_hr(window_days: u32) -> String {
        format!("Avg Resting HR ({}-day pre-race)", window_days)
    }

    pub fn avg_hrv(window_days: u32) -> String {
        format!("Avg HRV ({}-day pre-race)", window_days)
    }

    pub fn avg_sleep(window_days: u32) -> String {
        format!("Avg Sleep (hours, {}-day pre-race)", window_days)
    }

    pub fn normalized(label: &str) -> String {
        format!("Normalized {}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_column_names() {
        assert_eq!(columns::avg_resting_hr(7), "Avg Resting HR (7-day pre-race)");
        assert_eq!(columns::avg_hrv(14), "Avg HRV (14-day pre-race)");
        assert_eq!(columns::avg_sleep(7), "Avg Sleep (hours, 7-day pre-race)");
        assert_eq!(columns::normalized("Speed"), "Normalized Speed");
    }
}
