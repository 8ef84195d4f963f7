// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Date-keyed aggregation of session statistics

use std::collections::BTreeMap;

use crate::models::{DailyTelemetry, SessionStats};

fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Fold sessions sharing a date string into one record per date.
///
/// Max power and max HR take the day's maximum, average power and average HR
/// the mean of the session averages, duration the sum. Dates are compared as
/// strings. Output is ordered by date.
pub fn aggregate_by_date(sessions: &[SessionStats]) -> Vec<DailyTelemetry> {
    let mut by_date: BTreeMap<&str, Vec<&SessionStats>> = BTreeMap::new();
    for session in sessions {
        by_date.entry(session.date.as_str()).or_default().push(session);
    }

    by_date
        .into_iter()
        .map(|(date, day)| DailyTelemetry {
            date: date.to_string(),
            max_power: max_of(day.iter().map(|s| s.max_power)).unwrap_or_default(),
            avg_power: mean_of(day.iter().map(|s| s.avg_power)).unwrap_or_default(),
            max_hr: max_of(day.iter().filter_map(|s| s.max_hr)),
            avg_hr: mean_of(day.iter().filter_map(|s| s.avg_hr)),
            duration_minutes: day.iter().map(|s| s.duration_minutes).sum(),
            session_count: day.len(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(date: &str, max_power: f64, avg_power: f64, avg_hr: Option<f64>, duration: f64) -> SessionStats {
        SessionStats {
            date: date.to_string(),
            max_power,
            avg_power,
            max_hr: avg_hr.map(|hr| hr + 30.0),
            avg_hr,
            duration_minutes: duration,
            filename: format!("{}-{}.tcx", date, max_power),
        }
    }

    #[test]
    fn test_same_day_sessions_fold() {
        let daily = aggregate_by_date(&[
            stats("2024-09-08", 300.0, 220.0, Some(150.0), 45.0),
            stats("2024-09-08", 280.0, 200.0, None, 40.0),
        ]);

        assert_eq!(daily.len(), 1);
        let day = &daily[0];
        assert_eq!(day.date, "2024-09-08");
        assert_eq!(day.max_power, 300.0);
        assert_eq!(day.avg_power, 210.0);
        assert_eq!(day.max_hr, Some(180.0));
        assert_eq!(day.avg_hr, Some(150.0));
        assert_eq!(day.duration_minutes, 85.0);
        assert_eq!(day.session_count, 2);
    }

    #[test]
    fn test_dates_unique_and_ordered() {
        let daily = aggregate_by_date(&[
            stats("2024-09-09", 310.0, 230.0, None, 60.0),
            stats("2024-09-08", 300.0, 220.0, None, 45.0),
            stats("2024-09-09", 290.0, 210.0, None, 30.0),
        ]);

        let dates: Vec<&str> = daily.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-09-08", "2024-09-09"]);
        assert_eq!(daily[1].avg_power, 220.0);
        assert_eq!(daily[1].max_hr, None);
    }

    #[test]
    fn test_date_keys_compared_as_strings() {
        let daily = aggregate_by_date(&[
            stats("2024-09-08", 300.0, 220.0, None, 45.0),
            stats("2024-9-8", 280.0, 200.0, None, 40.0),
        ]);
        assert_eq!(daily.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_by_date(&[]).is_empty());
    }
}
