//! CLI entry point for the energy sales report.
//!
//! Provides subcommands for running the weekly report over CSV inputs,
//! generating synthetic inputs, and running an in-memory demo.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use energy_sales_report::analyzers::run_pipeline;
use energy_sales_report::config::{ReportConfig, parse_date};
use energy_sales_report::output::{log_summary, write_records, write_report};
use energy_sales_report::source::{bucket_by_week, load_assets, load_transactions};
use energy_sales_report::synthetic::{SampleConfig, generate};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "energy_sales_report")]
#[command(about = "Weekly sales analytics for energy-asset portfolios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the weekly report from transaction and asset CSVs
    Run {
        /// Transactions CSV (date,portfolio_id,asset_type,MWh,price[,year_week])
        #[arg(short, long)]
        transactions: PathBuf,

        /// Assets CSV (portfolio_id,asset_id,geography,ISO,operational_date,timezone)
        #[arg(short, long)]
        assets: PathBuf,

        /// Directory to write the report CSVs to
        #[arg(short = 'd', long)]
        output_dir: Option<String>,

        /// Reference date for portfolio age (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_as_of)]
        as_of: Option<NaiveDate>,

        /// Optional JSON config file
        #[arg(short, long)]
        config: Option<String>,

        /// Also write the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write synthetic transactions.csv and assets.csv
    Generate {
        /// Directory to write the CSVs to
        #[arg(short = 'd', long, default_value = "data")]
        output_dir: String,

        /// Random seed
        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        /// Number of weeks of hourly transactions
        #[arg(short, long, default_value_t = 4)]
        weeks: usize,
    },
    /// Generate data in memory, run the pipeline and log the summary
    Demo {
        /// Random seed
        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        /// Reference date for portfolio age (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_as_of)]
        as_of: Option<NaiveDate>,
    },
}

fn parse_as_of(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/energy_sales_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("energy_sales_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            transactions,
            assets,
            output_dir,
            as_of,
            config,
            json,
        } => {
            let mut cfg = match config {
                Some(path) => ReportConfig::load(&path)?,
                None => ReportConfig::default(),
            }
            .with_env_overrides()?;
            if as_of.is_some() {
                cfg.as_of = as_of;
            }
            if let Some(dir) = output_dir {
                cfg.output_dir = dir;
            }
            cfg.write_json |= json;

            run_report(&transactions, &assets, &cfg)?;
        }
        Commands::Generate {
            output_dir,
            seed,
            weeks,
        } => {
            let as_of = ReportConfig::default().with_env_overrides()?.resolve_as_of();
            let sample = generate(&SampleConfig {
                weeks,
                ..SampleConfig::new(seed, as_of)
            });

            let dir = Path::new(&output_dir);
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create '{}'", dir.display()))?;
            write_records(&dir.join("transactions.csv"), &sample.transactions)?;
            write_records(&dir.join("assets.csv"), &sample.assets)?;

            info!(
                output_dir = %output_dir,
                seed,
                transactions = sample.transactions.len(),
                assets = sample.assets.len(),
                "Synthetic data written"
            );
        }
        Commands::Demo { seed, as_of } => {
            let cfg = ReportConfig::default().with_env_overrides()?;
            let as_of = as_of.unwrap_or_else(|| cfg.resolve_as_of());

            let sample = generate(&SampleConfig::new(seed, as_of));
            let weekly = bucket_by_week(sample.transactions);
            let report = run_pipeline(&weekly, &sample.assets, as_of)?;

            log_summary(&report.summary);
            info!(
                weeks = report.comparison.weeks.len(),
                pairs = report.summary.len(),
                "Demo complete"
            );
        }
    }

    Ok(())
}

/// Loads both sources, runs the pipeline and writes the report.
#[tracing::instrument(skip_all, fields(transactions = %transactions.display(), assets = %assets.display()))]
fn run_report(transactions: &Path, assets: &Path, cfg: &ReportConfig) -> Result<()> {
    let as_of = cfg.resolve_as_of();

    let records = load_transactions(transactions)
        .with_context(|| format!("failed to load transactions from '{}'", transactions.display()))?;
    let asset_records = load_assets(assets)
        .with_context(|| format!("failed to load assets from '{}'", assets.display()))?;

    let weekly = bucket_by_week(records);
    info!(weeks = weekly.len(), %as_of, "Running weekly report");

    let report = run_pipeline(&weekly, &asset_records, as_of)?;
    log_summary(&report.summary);
    write_report(Path::new(&cfg.output_dir), &report, cfg.write_json)?;

    Ok(())
}
