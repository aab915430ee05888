//! agedcare - aged care provider data pipelines
//!
//! CLI entry point for running, scheduling and inspecting pipelines.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use tracing::{info, warn};

use agedcare::cli::{Cli, Command};
use agedcare::config::Config;
use agedcare::fetch::{HttpTransport, RetryPolicy, Transport};
use agedcare::monitoring::{self, Health};
use agedcare::orchestrator::{self, BatchOrchestrator, RunOptions, RunSummary};
use agedcare::pipeline::{Pipeline, PipelineKind};
use agedcare::scheduler::Scheduler;
use agedcare::{FetchFailurePolicy, RunStamp};

fn setup_logging(verbose: bool, log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    // Write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("agedcare.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The log directory comes from config, so config is loaded first
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    // A healthcheck must not freshen the log it inspects
    if !matches!(cli.command, Command::Healthcheck { .. }) {
        setup_logging(cli.verbose, &config.paths.log_dir).context("Failed to setup logging")?;
    }
    info!(
        raw_dir = %config.paths.raw_dir.display(),
        schedules = config.schedules.len(),
        "agedcare loaded config"
    );

    match cli.command {
        Command::Run {
            pipeline,
            limit,
            archive,
            keep_raw,
            skip_failed,
        } => {
            let mut options = RunOptions::from_config(&config.run);
            options.limit = limit.or(options.limit);
            options.archive |= archive;
            options.keep_raw |= keep_raw;
            if skip_failed {
                options.on_fetch_error = FetchFailurePolicy::Skip;
            }
            cmd_run(&config, pipeline, options).await
        }
        Command::Fetch { pipeline, limit } => cmd_fetch(&config, pipeline, limit).await,
        Command::Parse { pipeline, json_file } => cmd_parse(&config, pipeline, &json_file),
        Command::Write { pipeline, records_file } => cmd_write(&config, pipeline, &records_file),
        Command::Cleanup { pipeline, keep_raw } => cmd_cleanup(&config, pipeline, keep_raw || config.run.keep_raw),
        Command::Schedule => cmd_schedule(&config).await,
        Command::Healthcheck { max_age_hours } => cmd_healthcheck(&config, max_age_hours),
        Command::Pipelines => cmd_pipelines(&config),
    }
}

/// Build an orchestrator with the HTTP transport
fn orchestrator_for(config: &Config, kind: PipelineKind, options: RunOptions) -> Result<BatchOrchestrator> {
    let pipeline = Pipeline::from_config(kind, config)?;
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(config.fetch.timeout()).context("Failed to build HTTP client")?);
    Ok(BatchOrchestrator::new(
        pipeline,
        transport,
        RetryPolicy::from_config(&config.fetch),
        options,
        RunStamp::today(),
    ))
}

/// Run one pipeline's full cycle
async fn run_pipeline(config: &Config, kind: PipelineKind, options: RunOptions) -> Result<RunSummary> {
    let mut orchestrator = orchestrator_for(config, kind, options)?;
    let result = orchestrator.run().await;
    result.context(format!("{} run failed in phase {}", kind, orchestrator.phase()))
}

async fn cmd_run(config: &Config, kind: PipelineKind, options: RunOptions) -> Result<()> {
    println!("Running {} pipeline...", kind.to_string().cyan());
    let summary = run_pipeline(config, kind, options).await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let coverage = &summary.coverage;
    match &summary.output {
        Some(path) => println!("{} Wrote {} rows to {}", "✓".green(), summary.rows_written, path.display()),
        None => println!("{} No rows produced, no CSV written", "!".yellow()),
    }
    println!(
        "  Coverage: {}/{} ({:.1}%)",
        coverage.covered(),
        coverage.attempted(),
        coverage.coverage_pct()
    );
    if coverage.incomplete_rows() > 0 {
        println!("  Incomplete rows: {}", coverage.incomplete_rows().to_string().yellow());
    }
    let missed = coverage.missed();
    if !missed.is_empty() {
        println!("  Missed ids: {:?}", missed);
    }
    if !coverage.failed().is_empty() {
        println!("  {} Failed fetches: {:?}", "✗".red(), coverage.failed());
    }
    if let Some(archive) = &summary.archive {
        println!(
            "{} Archived {} raw files to {}",
            "✓".green(),
            archive.merged,
            archive.archive.display()
        );
    }
}

async fn cmd_fetch(config: &Config, kind: PipelineKind, limit: Option<usize>) -> Result<()> {
    let mut options = RunOptions::from_config(&config.run);
    options.limit = limit.or(options.limit);
    let mut orchestrator = orchestrator_for(config, kind, options)?;

    let outcome = orchestrator.fetch_only().await.context(format!("{} fetch failed", kind))?;
    println!("{} Fetched {} {} documents", "✓".green(), outcome.fetched, kind);
    if !outcome.failed.is_empty() {
        println!("  {} Failed: {:?}", "✗".red(), outcome.failed);
    }
    Ok(())
}

fn cmd_parse(config: &Config, kind: PipelineKind, json_file: &Path) -> Result<()> {
    let pipeline = Pipeline::from_config(kind, config)?;
    let (path, rows) = orchestrator::parse_file(&pipeline, json_file)?;
    println!("{} Parsed {} rows to {}", "✓".green(), rows, path.display());
    Ok(())
}

fn cmd_write(config: &Config, kind: PipelineKind, records_file: &Path) -> Result<()> {
    let pipeline = Pipeline::from_config(kind, config)?;
    match orchestrator::write_records(&pipeline, records_file)? {
        Some(path) => println!("{} Wrote CSV to {}", "✓".green(), path.display()),
        None => println!("{} No records in {}, no CSV written", "!".yellow(), records_file.display()),
    }
    Ok(())
}

fn cmd_cleanup(config: &Config, kind: PipelineKind, keep_raw: bool) -> Result<()> {
    let pipeline = Pipeline::from_config(kind, config)?;
    let summary = orchestrator::archive_raw(pipeline.name(), &pipeline.dirs, &RunStamp::today(), keep_raw)?;

    println!(
        "{} Merged {} raw files into {}",
        "✓".green(),
        summary.merged,
        summary.archive.display()
    );
    println!(
        "  Deleted {} raw, {} interim, {} partial files",
        summary.raw_deleted, summary.interim_deleted, summary.partial_deleted
    );
    for path in &summary.skipped {
        println!("  {} Skipped unreadable {}", "✗".red(), path.display());
    }
    Ok(())
}

async fn cmd_schedule(config: &Config) -> Result<()> {
    if config.schedules.is_empty() {
        bail!("No schedules configured; add a `schedules` list to the config file");
    }
    let scheduler = Scheduler::from_config(&config.schedules)?;
    for job in scheduler.jobs() {
        println!("Scheduled {} {} {}", job.pipeline.to_string().cyan(), "→".dimmed(), job.expression);
    }
    println!("Scheduler running. Press Ctrl+C to stop.");

    scheduler
        .run(
            |kind| {
                let config = config.clone();
                async move {
                    let summary = run_pipeline(&config, kind, RunOptions::from_config(&config.run)).await?;
                    info!(
                        pipeline = %kind,
                        rows = summary.rows_written,
                        coverage = summary.coverage.coverage_pct(),
                        "Scheduled run summary"
                    );
                    Ok::<(), eyre::Report>(())
                }
            },
            shutdown_signal(),
        )
        .await
}

/// Completes on SIGINT or SIGTERM (Ctrl+C elsewhere)
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => warn!("SIGINT received"),
                    _ = sigterm.recv() => warn!("SIGTERM received"),
                }
                return;
            }
            _ => warn!("Failed to install signal handlers, falling back to Ctrl+C"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

fn cmd_healthcheck(config: &Config, max_age_hours: u64) -> Result<()> {
    let max_age = Duration::from_secs(max_age_hours.saturating_mul(60 * 60));
    match monitoring::healthcheck(&config.paths.log_dir, max_age) {
        Health::Healthy { newest, age } => {
            println!(
                "{} Healthcheck passed: {} written {}m ago",
                "✓".green(),
                newest.display(),
                age.as_secs() / 60
            );
            Ok(())
        }
        Health::Stale { newest, age } => {
            monitoring::alert_on_failure("healthcheck", "no recent pipeline activity");
            bail!(
                "Newest log {} is {}h old (limit {}h)",
                newest.display(),
                age.as_secs() / 3600,
                max_age_hours
            )
        }
        Health::Missing => {
            monitoring::alert_on_failure("healthcheck", "no log files found");
            bail!("No log files in {}", config.paths.log_dir.display())
        }
    }
}

fn cmd_pipelines(config: &Config) -> Result<()> {
    for kind in PipelineKind::ALL {
        let pipeline = Pipeline::from_config(kind, config)?;
        println!("{}", kind.to_string().bold());
        println!("  endpoint:  {}", pipeline.endpoint);
        println!("  nids:      {}", pipeline.nids_csv.display());
        println!("  raw:       {}", pipeline.dirs.raw.display());
        println!("  output:    {}", pipeline.dirs.output.display());
        if let Some(expand) = pipeline.schema.expansion() {
            println!("  rows per:  {}", expand);
        }
        let columns: Vec<&str> = pipeline.schema.column_names().collect();
        println!("  columns:   {}", columns.join(", ").dimmed());
    }
    Ok(())
}
