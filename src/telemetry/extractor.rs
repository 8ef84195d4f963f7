// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-file session statistics and the parallel batch runner

use chrono::{DateTime, NaiveDateTime};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::models::{round_to, SessionStats};
use super::tcx::{parse_tcx, TcxError, TcxSession};
use super::{BatchReport, SessionOutcome, SkipReason, SkippedFile, TelemetryError};

/// Reduce one telemetry file to session statistics
pub fn extract_session(path: &Path) -> SessionOutcome {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    match fs::read_to_string(path) {
        Ok(content) => extract_session_from_str(&content, &filename),
        Err(e) => SessionOutcome::Skipped(SkipReason::Unreadable(e.to_string())),
    }
}

/// Same as [`extract_session`] for content already in memory
pub fn extract_session_from_str(content: &str, filename: &str) -> SessionOutcome {
    match parse_tcx(content) {
        Ok(session) => summarize_session(&session, filename),
        Err(TcxError::Xml(message)) => SessionOutcome::Skipped(SkipReason::MalformedXml(message)),
        Err(e @ TcxError::InvalidReading { .. }) => {
            SessionOutcome::Skipped(SkipReason::InvalidReading(e.to_string()))
        }
    }
}

/// Statistics over a parsed session; no power readings means no statistics
pub fn summarize_session(session: &TcxSession, filename: &str) -> SessionOutcome {
    if !session.has_activity {
        return SessionOutcome::Skipped(SkipReason::NoActivity);
    }
    let Some(session_id) = session.session_id.as_deref() else {
        return SessionOutcome::Skipped(SkipReason::MissingSessionId);
    };

    let watts: Vec<f64> = session.samples.iter().filter_map(|s| s.watts).collect();
    if watts.is_empty() {
        return SessionOutcome::Skipped(SkipReason::NoPowerSamples);
    }
    let heart_rates: Vec<f64> = session.samples.iter().filter_map(|s| s.heart_rate).collect();

    let avg_power = watts.iter().sum::<f64>() / watts.len() as f64;
    let max_power = watts.iter().copied().fold(f64::MIN, f64::max);
    let (avg_hr, max_hr) = if heart_rates.is_empty() {
        (None, None)
    } else {
        (
            Some(heart_rates.iter().sum::<f64>() / heart_rates.len() as f64),
            Some(heart_rates.iter().copied().fold(f64::MIN, f64::max)),
        )
    };

    let times: Vec<&str> = session.samples.iter().filter_map(|s| s.time.as_deref()).collect();

    SessionOutcome::Extracted(SessionStats {
        date: session_id.split('T').next().unwrap_or(session_id).to_string(),
        max_power: round_to(max_power, 1),
        avg_power: round_to(avg_power, 1),
        max_hr,
        avg_hr: avg_hr.map(|hr| round_to(hr, 1)),
        duration_minutes: round_to(span_minutes(&times), 1),
        filename: filename.to_string(),
    })
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

/// Minutes between the first and last timestamp; 0 when either is missing or
/// unparseable
pub fn span_minutes(times: &[&str]) -> f64 {
    if times.len() < 2 {
        return 0.0;
    }
    let first = times.first().and_then(|t| parse_timestamp(t));
    let last = times.last().and_then(|t| parse_timestamp(t));
    match (first, last) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 60_000.0,
        _ => 0.0,
    }
}

/// List the `.tcx` files of a directory, sorted by path
pub fn discover_sessions(dir: &Path) -> Result<Vec<PathBuf>, TelemetryError> {
    let entries = fs::read_dir(dir).map_err(|source| TelemetryError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("tcx"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Extract every file on a worker pool sized to the available cores.
///
/// A file that cannot be summarized is reported in `skipped`; it never stops
/// the batch.
pub fn extract_batch(files: &[PathBuf]) -> Result<BatchReport, TelemetryError> {
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| TelemetryError::WorkerPool(e.to_string()))?;

    let started = Instant::now();
    let outcomes: Vec<(&PathBuf, SessionOutcome)> = pool.install(|| {
        files
            .par_iter()
            .map(|path| (path, extract_session(path)))
            .collect()
    });

    let mut report = BatchReport::default();
    for (path, outcome) in outcomes {
        match outcome {
            SessionOutcome::Extracted(stats) => report.sessions.push(stats),
            SessionOutcome::Skipped(reason) => {
                debug!(file = %path.display(), reason = %reason, "Skipped telemetry file");
                report.skipped.push(SkippedFile { path: path.clone(), reason });
            }
        }
    }
    report
        .sessions
        .sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.filename.cmp(&b.filename)));

    info!(
        files = files.len(),
        extracted = report.sessions.len(),
        skipped = report.skipped.len(),
        workers = threads,
        duration_ms = started.elapsed().as_millis() as u64,
        "Telemetry batch processed"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::tcx::TrackSample;

    fn sample(time: Option<&str>, watts: Option<f64>, heart_rate: Option<f64>) -> TrackSample {
        TrackSample {
            time: time.map(str::to_string),
            watts,
            heart_rate,
        }
    }

    fn session(samples: Vec<TrackSample>) -> TcxSession {
        TcxSession {
            has_activity: true,
            session_id: Some("2024-09-08T07:00:00Z".to_string()),
            samples,
        }
    }

    #[test]
    fn test_statistics_over_readings() {
        let outcome = summarize_session(
            &session(vec![
                sample(Some("2024-09-08T07:00:00Z"), Some(200.0), Some(140.0)),
                sample(Some("2024-09-08T07:20:00Z"), Some(310.0), None),
                sample(Some("2024-09-08T07:45:30Z"), Some(151.0), Some(165.0)),
            ]),
            "race.tcx",
        );

        let SessionOutcome::Extracted(stats) = outcome else {
            panic!("expected statistics");
        };
        assert_eq!(stats.date, "2024-09-08");
        assert_eq!(stats.max_power, 310.0);
        assert_eq!(stats.avg_power, 220.3);
        assert_eq!(stats.max_hr, Some(165.0));
        assert_eq!(stats.avg_hr, Some(152.5));
        assert_eq!(stats.duration_minutes, 45.5);
        assert_eq!(stats.filename, "race.tcx");
    }

    #[test]
    fn test_heart_rate_null_without_readings() {
        let outcome = summarize_session(&session(vec![sample(None, Some(250.0), None)]), "a.tcx");
        let SessionOutcome::Extracted(stats) = outcome else {
            panic!("expected statistics");
        };
        assert_eq!(stats.max_hr, None);
        assert_eq!(stats.avg_hr, None);
        assert_eq!(stats.duration_minutes, 0.0);
    }

    #[test]
    fn test_no_power_is_skipped() {
        let outcome = summarize_session(&session(vec![sample(None, None, Some(150.0))]), "hr_only.tcx");
        assert_eq!(outcome, SessionOutcome::Skipped(SkipReason::NoPowerSamples));
    }

    #[test]
    fn test_missing_envelope_and_id() {
        let no_activity = TcxSession::default();
        assert_eq!(summarize_session(&no_activity, "x.tcx"), SessionOutcome::Skipped(SkipReason::NoActivity));

        let no_id = TcxSession { has_activity: true, ..TcxSession::default() };
        assert_eq!(summarize_session(&no_id, "x.tcx"), SessionOutcome::Skipped(SkipReason::MissingSessionId));
    }

    #[test]
    fn test_span_minutes_best_effort() {
        assert_eq!(span_minutes(&[]), 0.0);
        assert_eq!(span_minutes(&["2024-09-08T07:00:00Z"]), 0.0);
        assert_eq!(span_minutes(&["2024-09-08T07:00:00Z", "garbage"]), 0.0);
        assert_eq!(span_minutes(&["2024-09-08T07:00:00", "2024-09-08T08:30:00"]), 90.0);
        assert_eq!(
            span_minutes(&["2024-09-08T07:00:00+02:00", "2024-09-08T05:30:00Z"]),
            30.0
        );
    }

    #[test]
    fn test_malformed_content_is_tagged() {
        let outcome = extract_session_from_str("<TrainingCenterDatabase><Activity></Lap>", "bad.tcx");
        assert!(matches!(outcome, SessionOutcome::Skipped(SkipReason::MalformedXml(_))));
    }
}
