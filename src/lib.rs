// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Race Performance
//!
//! Builds a per-race performance record for one endurance athlete and scores
//! every race against the rest of the athlete's races.
//!
//! ## Features
//!
//! - **Race records**: race-flagged activities with unit conversions,
//!   power-to-weight, pre-race wellness averages and training load
//! - **Session telemetry**: parallel extraction of TCX files into per-session
//!   and per-day power and heart rate statistics
//! - **Performance Score**: cohort-relative min-max composite over a
//!   configurable metric list
//! - **Artifacts**: CSV tables with stable column names
//!
//! ## Architecture
//!
//! - **Providers**: the [`RaceDataSource`](providers::RaceDataSource) seam and its
//!   intervals.icu and in-memory implementations
//! - **Wellness / Races**: enrichment of race activities
//! - **Telemetry**: TCX parsing, session statistics, daily aggregation
//! - **Merge / Scoring / Cohort**: join, normalization and cohort selection
//! - **Pipeline**: stage orchestration and artifact writing
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use race_performance::config::{PipelineConfig, SourceConfig};
//! use race_performance::pipeline::Pipeline;
//! use race_performance::providers::create_provider;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source_config = SourceConfig::from_env()?;
//!     let source = create_provider(&source_config.provider, &source_config).await?;
//!
//!     let pipeline = Pipeline::new(source, PipelineConfig::load(None)?);
//!     let today = chrono::Local::now().date_naive();
//!     let output = pipeline.run(Some("telemetry".as_ref()), today).await?;
//!     pipeline.write_artifacts(&output, &source_config.output_dir)?;
//!
//!     for scored in race_performance::cohort::rank(output.scored) {
//!         println!("{} {:?}", scored.record.race.name, scored.performance_score);
//!     }
//!     Ok(())
//! }
//! ```

/// Activity and wellness data sources
pub mod providers;

/// Records flowing between pipeline stages
pub mod models;

/// TOML and environment configuration
pub mod config;

/// Endpoints, defaults and column names
pub mod constants;

/// Pre-race wellness windows, training load and weight lookups
pub mod wellness;

/// Race record building
pub mod races;

/// TCX session extraction and daily aggregation
pub mod telemetry;

/// Race and telemetry join
pub mod merge;

/// Min-max Performance Score
pub mod scoring;

/// Cohort filters and orderings
pub mod cohort;

/// CSV artifacts
pub mod output;

/// Stage orchestration
pub mod pipeline;

/// Structured logging
pub mod logging;
