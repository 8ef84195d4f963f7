// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Structured logging for pipeline runs.
//!
//! Log lines go to stderr so artifacts and summaries printed on stdout stay
//! machine readable.

use anyhow::Result;
use std::env;
use std::io;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset or invalid
    pub level: String,
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Emit span open/close events
    pub include_spans: bool,
    /// Deployment environment (development, production)
    pub environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-line, human oriented
    Pretty,
    /// Single line without targets
    Compact,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value; anything unknown falls back to pretty
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
            include_spans: false,
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG`, `LOG_FORMAT`, `ENVIRONMENT`, `LOG_INCLUDE_LOCATION`
    /// and `LOG_INCLUDE_SPANS`
    pub fn from_env() -> Self {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            format: env::var("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(LogFormat::Pretty),
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            environment,
        }
    }

    /// Lower the level to `debug` unless `RUST_LOG` overrides it
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = "debug".to_string();
        }
        self
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Initialize the global tracing subscriber
    pub fn init(&self) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let registry = tracing_subscriber::registry().with(env_filter);

        match self.format {
            LogFormat::Json => {
                let layer = fmt::layer()
                    .json()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_writer(io::stderr)
                    .with_span_events(self.span_events());
                registry.with(layer).try_init()?;
            }
            LogFormat::Pretty => {
                let layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_writer(io::stderr)
                    .with_span_events(self.span_events());
                registry.with(layer).try_init()?;
            }
            LogFormat::Compact => {
                let layer = fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(io::stderr);
                registry.with(layer).try_init()?;
            }
        }

        info!(
            service.version = %env!("CARGO_PKG_VERSION"),
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Race performance pipeline starting up"
        );
        Ok(())
    }
}

/// Initialize logging from environment
pub fn init_from_env(verbose: bool) -> Result<()> {
    LoggingConfig::from_env().verbose(verbose).init()
}

/// Stage-level events for pipeline runs
pub struct PipelineLogger;

impl PipelineLogger {
    /// Log a completed pipeline stage
    pub fn log_stage(stage: &str, records: usize, duration_ms: u64) {
        info!(
            pipeline.stage = %stage,
            pipeline.records = %records,
            pipeline.duration_ms = %duration_ms,
            "Pipeline stage completed"
        );
    }

    /// Log a data source request outcome
    pub fn log_source_request(provider: &str, resource: &str, success: bool, records: usize) {
        info!(
            source.provider = %provider,
            source.resource = %resource,
            source.success = %success,
            source.records = %records,
            "Data source request"
        );
    }

    /// Log telemetry batch totals
    pub fn log_telemetry_batch(files: usize, extracted: usize, skipped: usize) {
        if skipped > 0 {
            warn!(
                telemetry.files = %files,
                telemetry.extracted = %extracted,
                telemetry.skipped = %skipped,
                "Telemetry files skipped"
            );
        } else {
            info!(
                telemetry.files = %files,
                telemetry.extracted = %extracted,
                "Telemetry batch complete"
            );
        }
    }

    /// Log an artifact written to disk
    pub fn log_artifact(path: &str, rows: usize) {
        info!(
            artifact.path = %path,
            artifact.rows = %rows,
            "Artifact written"
        );
    }

    /// Log a race scoring below zero
    pub fn log_outlier(activity_id: &str, name: &str, score: f64) {
        warn!(
            race.id = %activity_id,
            race.name = %name,
            race.score = %score,
            "Negative performance score"
        );
    }
}
