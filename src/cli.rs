//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::PipelineKind;

/// agedcare - aged care provider data pipelines
#[derive(Parser)]
#[command(
    name = "agedcare",
    about = "Fetch, flatten and export aged care provider records",
    version,
    after_help = "Logs are written to <log-dir>/agedcare.log (default: data/logs/agedcare.log)"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Fetch, flatten and write one pipeline
    Run {
        /// Pipeline to run (operations, rads)
        pipeline: PipelineKind,

        /// Only process the first N identifiers
        #[arg(short, long)]
        limit: Option<usize>,

        /// Archive raw files and purge checkpoints after writing
        #[arg(long)]
        archive: bool,

        /// Keep per-id raw files when archiving
        #[arg(long)]
        keep_raw: bool,

        /// Skip ids whose fetch fails instead of aborting
        #[arg(long)]
        skip_failed: bool,
    },

    /// Fetch raw documents into the cache only
    Fetch {
        pipeline: PipelineKind,

        /// Only fetch the first N identifiers
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Flatten one raw JSON file into the interim directory
    Parse {
        pipeline: PipelineKind,

        /// Raw JSON document
        json_file: PathBuf,
    },

    /// Write a JSON list of rows as CSV into the output directory
    Write {
        pipeline: PipelineKind,

        /// JSON list of row objects
        records_file: PathBuf,
    },

    /// Merge raw files into the dated archive and purge checkpoints
    Cleanup {
        pipeline: PipelineKind,

        /// Keep per-id raw files after merging
        #[arg(long)]
        keep_raw: bool,
    },

    /// Run configured schedules in the foreground
    Schedule,

    /// Check that a run has logged recently
    Healthcheck {
        /// Maximum age of the newest log file
        #[arg(long, default_value = "48")]
        max_age_hours: u64,
    },

    /// List pipelines with their endpoints and columns
    Pipelines,
}
