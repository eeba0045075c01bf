use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use tracing::{error, info};

use proctally::config::{self, Config, load_config, load_config_from_path};
use proctally::logging::init_logging;
use proctally::monitor::{MonitorLoop, OutputMode};
use proctally::sink::csv::CsvSink;
use proctally::sink::database::SummaryDatabase;
use proctally::system::os::OsProcessSource;
use proctally::system::snapshot::SnapshotCollector;

#[derive(Parser)]
#[command(
    name = "proctally",
    about = "Sample per-process CPU and memory usage and record running averages"
)]
struct Cli {
    /// Path to config file (TOML, or legacy config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds between snapshots
    #[arg(long)]
    interval: Option<u64>,

    /// Total run length in seconds
    #[arg(long)]
    duration: Option<u64>,

    /// CSV history file
    #[arg(long)]
    output: Option<PathBuf>,

    /// What each iteration appends to the CSV
    #[arg(long, value_enum)]
    output_mode: Option<OutputMode>,

    /// SQLite database receiving the end-of-run summary
    #[arg(long)]
    database: Option<PathBuf>,

    /// Delete the CSV file before the run
    #[arg(long, default_value_t = false)]
    delete_csv: bool,

    /// Drop and recreate the summary table before the export
    #[arg(long, default_value_t = false)]
    delete_db: bool,

    /// Process name to skip; repeatable
    #[arg(long = "exclude", value_name = "NAME")]
    exclude: Vec<String>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Echo log events to the console at debug level
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli)?;
    init_logging(&config.logging).wrap_err("failed to initialize logging")?;

    if let Err(e) = run(&config) {
        error!("Critical failure, run aborted: {e:#}");
        return Err(e);
    }
    Ok(())
}

fn run(config: &Config) -> Result<()> {
    config.validate()?;
    info!(
        interval = config.monitor.interval_secs,
        duration = config.monitor.duration_secs,
        excluded = config.monitor.exclude_processes.len(),
        "proctally starting"
    );

    let mut monitor = MonitorLoop::new(
        OsProcessSource::new(),
        SnapshotCollector::new(),
        config.monitor.exclude_processes.iter().cloned(),
    )
    .with_output_mode(config.monitor.output_mode);

    let mut csv = CsvSink::new(&config.output.csv_path);
    let summary = monitor
        .run(
            config.monitor.interval_secs,
            config.monitor.duration_secs,
            &mut csv,
            config.output.delete_csv_file,
        )
        .wrap_err_with(|| format!("monitoring into {}", csv.path().display()))?;
    info!(
        iterations = summary.iterations,
        failed = summary.batches_failed,
        rows = summary.rows_written,
        "monitoring finished"
    );

    let samples = monitor.into_store().samples();
    let mut db = SummaryDatabase::open(&config.database.path).wrap_err_with(|| {
        format!("failed to open database {}", config.database.path.display())
    })?;
    let exported = db
        .export(&samples, config.database.delete_table)
        .wrap_err("failed to export process summary")?;
    info!(rows = exported, "process summary exported");

    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path)
            .wrap_err_with(|| format!("failed to load config {}", path.display()))?,
        None => load_config().wrap_err_with(|| {
            let path = config::config_path().unwrap_or_default();
            format!("failed to load config {}", path.display())
        })?,
    };

    if let Some(interval) = cli.interval {
        config.monitor.interval_secs = interval;
    }
    if let Some(duration) = cli.duration {
        config.monitor.duration_secs = duration;
    }
    if let Some(ref output) = cli.output {
        config.output.csv_path = output.clone();
    }
    if let Some(mode) = cli.output_mode {
        config.monitor.output_mode = mode;
    }
    if let Some(ref database) = cli.database {
        config.database.path = database.clone();
    }
    if let Some(ref log_file) = cli.log_file {
        config.logging.file = log_file.clone();
    }
    if !cli.exclude.is_empty() {
        config.monitor.exclude_processes.extend(cli.exclude.iter().cloned());
    }
    config.output.delete_csv_file |= cli.delete_csv;
    config.database.delete_table |= cli.delete_db;
    config.logging.debug |= cli.debug;

    Ok(config)
}
