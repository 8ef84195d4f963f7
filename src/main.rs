// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use race_performance::cohort;
use race_performance::config::{PipelineConfig, SourceConfig};
use race_performance::constants::artifacts;
use race_performance::logging::{self, PipelineLogger};
use race_performance::output::TableLayout;
use race_performance::pipeline::{self, Pipeline};
use race_performance::providers::create_provider;
use race_performance::telemetry::aggregate_by_date;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build, merge and score race records, writing every artifact
    Run {
        /// Directory of TCX session files
        #[arg(long)]
        telemetry_dir: Option<PathBuf>,

        /// Output directory (defaults to RACE_OUTPUT_DIR)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Pipeline configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Only score races whose name contains this text
        #[arg(long)]
        name_contains: Option<String>,
    },
    /// Build race records only
    Races {
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[arg(short, long)]
        config: Option<String>,
    },
    /// Extract TCX sessions and aggregate them per day
    Telemetry {
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Write the default pipeline configuration
    InitConfig {
        /// Target file (defaults to the user config directory)
        #[arg(short, long)]
        path: Option<String>,
    },
}

async fn build_pipeline(config_path: Option<String>, name_contains: Option<String>) -> Result<(Pipeline, SourceConfig)> {
    let source_config = SourceConfig::from_env()?;
    let mut pipeline_config = PipelineConfig::load(config_path)?;
    if name_contains.is_some() {
        pipeline_config.name_contains = name_contains;
    }
    let source = create_provider(&source_config.provider, &source_config)
        .await
        .context("Failed to create data source")?;
    Ok((Pipeline::new(source, pipeline_config), source_config))
}

async fn run(
    telemetry_dir: Option<PathBuf>,
    out: Option<PathBuf>,
    config: Option<String>,
    name_contains: Option<String>,
) -> Result<()> {
    let (pipeline, source_config) = build_pipeline(config, name_contains).await?;
    let out = out.unwrap_or(source_config.output_dir);

    let output = pipeline
        .run(telemetry_dir.as_deref(), Local::now().date_naive())
        .await?;
    pipeline.write_artifacts(&output, &out)?;

    let outlier_view = pipeline.score_outlier_view(&output.merged);
    for outlier in cohort::negative_outliers(&outlier_view) {
        let race = &outlier.record.race;
        PipelineLogger::log_outlier(&race.activity_id, &race.name, outlier.performance_score.unwrap_or_default());
    }

    if let Some(pooled) = pipeline.score_pooled(&output.merged) {
        pipeline::write(&out, artifacts::POOLED_SCORED_RECORDS, &pipeline.outlier_layout(), &pooled)?;
    }

    for scored in cohort::rank(output.scored) {
        let race = &scored.record.race;
        let score = scored
            .performance_score
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "-".to_string());
        println!("{}\t{}\t{}\t{}", score, race.date, race.activity_id, race.name);
    }
    Ok(())
}

async fn races(out: Option<PathBuf>, config: Option<String>) -> Result<()> {
    let (pipeline, source_config) = build_pipeline(config, None).await?;
    let out = out.unwrap_or(source_config.output_dir);

    let races = pipeline.fetch_race_records(Local::now().date_naive()).await?;
    race_performance::output::ensure_dir(&out)?;
    pipeline::write(&out, artifacts::RACE_RECORDS, &pipeline.layout(), &races)?;
    Ok(())
}

async fn telemetry(dir: PathBuf, out: PathBuf) -> Result<()> {
    let report = pipeline::extract_telemetry(&dir).await?;
    for skipped in &report.skipped {
        info!(file = %skipped.path.display(), reason = %skipped.reason, "Skipped telemetry file");
    }

    let sessions = report.into_sessions();
    let daily = aggregate_by_date(&sessions);
    let layout = TableLayout::default();

    race_performance::output::ensure_dir(&out)?;
    pipeline::write(&out, artifacts::SESSION_TELEMETRY, &layout, &sessions)?;
    pipeline::write(&out, artifacts::DAILY_TELEMETRY, &layout, &daily)?;
    Ok(())
}

fn init_config(path: Option<String>) -> Result<()> {
    PipelineConfig::default().save(path.clone())?;
    info!(path = ?path, "Wrote default pipeline configuration");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_from_env(args.verbose)?;

    match args.command {
        Command::Run { telemetry_dir, out, config, name_contains } => {
            run(telemetry_dir, out, config, name_contains).await
        }
        Command::Races { out, config } => races(out, config).await,
        Command::Telemetry { dir, out } => telemetry(dir, out).await,
        Command::InitConfig { path } => init_config(path),
    }
}
