// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Telemetry Module
//!
//! Reduces bulk session files (TCX exports) into per-session statistics and
//! folds them into one record per calendar date.
//!
//! - [`tcx`]: streaming reader for the XML format
//! - [`extractor`]: per-file statistics and the parallel batch runner
//! - [`daily`]: date-keyed aggregation

use std::path::PathBuf;

use crate::models::SessionStats;

pub mod daily;
pub mod extractor;
pub mod tcx;

pub use daily::aggregate_by_date;
pub use extractor::{discover_sessions, extract_batch, extract_session};

/// Result of reducing one file
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Extracted(SessionStats),
    Skipped(SkipReason),
}

/// Why a file produced no statistics
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("file unreadable: {0}")]
    Unreadable(String),

    #[error("malformed XML: {0}")]
    MalformedXml(String),

    #[error("invalid reading: {0}")]
    InvalidReading(String),

    #[error("no activity envelope")]
    NoActivity,

    #[error("activity has no session id")]
    MissingSessionId,

    #[error("no power samples")]
    NoPowerSamples,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Everything a batch produced
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Statistics sorted by date, then file name
    pub sessions: Vec<SessionStats>,
    pub skipped: Vec<SkippedFile>,
}

impl BatchReport {
    pub fn into_sessions(self) -> Vec<SessionStats> {
        self.sessions
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Cannot read telemetry directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start extraction workers: {0}")]
    WorkerPool(String),
}
