//! batch-dispatch - run a JSON file of records through the dispatch engine

#![allow(missing_docs)]

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use llm_batch_dispatch::utils::logging::{LogFormat, LogLevel, init_tracing};
use llm_batch_dispatch::{
    Config, Dispatcher, FailedItem, ItemResult, Record, RunReport, UsageStats,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "batch-dispatch", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(
        short,
        long,
        env = "BATCH_DISPATCH_CONFIG",
        default_value = "config/dispatch.yaml"
    )]
    config: PathBuf,

    /// JSON array of record objects
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the report; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// pretty or json
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    #[arg(long, env = "BATCH_DISPATCH_LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,
}

/// Report written at the end of a run
#[derive(Serialize)]
struct ReportDocument<'a> {
    /// Results and manual-review placeholders, in input order
    results: Vec<ItemResult>,
    permanently_failed: &'a [FailedItem],
    pending: &'a [FailedItem],
    total_count: usize,
    usage: UsageStats,
    estimated_cost_usd: f64,
    batches_sent: usize,
    waves: usize,
    final_concurrency: usize,
    cancelled: bool,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl<'a> ReportDocument<'a> {
    fn new(report: &'a RunReport, config: &Config) -> Self {
        Self {
            results: report.with_placeholders(),
            permanently_failed: &report.permanently_failed,
            pending: &report.pending,
            total_count: report.total_count,
            usage: report.usage,
            estimated_cost_usd: report.usage.estimated_cost(&config.pricing),
            batches_sent: report.batches_sent,
            waves: report.waves,
            final_concurrency: report.final_concurrency,
            cancelled: report.cancelled,
            started_at: report.started_at,
            finished_at: report.finished_at,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.log_level);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(130),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns false when the run was interrupted
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = Config::from_file(&cli.config)
        .await
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let records = read_records(&cli.input).await?;

    let dispatcher = Dispatcher::from_config(config.clone())
        .await
        .context("building dispatcher")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, letting in-flight batches finish");
            interrupt.cancel();
        }
    });

    let progress = |done: usize, total: usize| {
        info!(done, total, "Progress: {}/{}", done, total);
    };
    let report = dispatcher
        .process_all_with_cancel(records, Some(&progress), cancel)
        .await?;

    let document = ReportDocument::new(&report, &config);
    info!(
        requests = report.usage.requests,
        cost_usd = document.estimated_cost_usd,
        "Estimated cost: ${:.4}",
        document.estimated_cost_usd
    );

    let json = serde_json::to_string_pretty(&document)?;
    match &cli.output {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing report to {}", path.display()))?,
        None => println!("{}", json),
    }

    Ok(!report.cancelled)
}

async fn read_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading input from {}", path.display()))?;
    let records: Vec<Record> = serde_json::from_str(&content)
        .with_context(|| format!("{} must contain a JSON array of objects", path.display()))?;
    info!(records = records.len(), "Loaded {} records", records.len());
    Ok(records)
}
