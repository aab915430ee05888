//! Configuration types and loading

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineKind;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Working directory layout
    pub paths: PathsConfig,

    /// Remote fetch behavior
    pub fetch: FetchConfig,

    /// Run-scoped options
    pub run: RunConfig,

    /// Per-pipeline overrides
    pub pipelines: PipelinesConfig,

    /// Cron schedules for the `schedule` command
    pub schedules: Vec<ScheduleConfig>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// Explicit path, then `./.agedcare.yml`, then `<config_dir>/agedcare/agedcare.yml`,
    /// then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".agedcare.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("agedcare").join("agedcare.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Overrides for one pipeline kind
    pub fn pipeline(&self, kind: PipelineKind) -> &PipelineConfig {
        match kind {
            PipelineKind::Operations => &self.pipelines.operations,
            PipelineKind::Rads => &self.pipelines.rads,
        }
    }
}

/// Working directory layout; each pipeline gets a `<dir>/<pipeline>` subdirectory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Per-id raw JSON cache
    #[serde(rename = "raw-dir")]
    pub raw_dir: PathBuf,

    /// Per-id flattened checkpoints
    #[serde(rename = "interim-dir")]
    pub interim_dir: PathBuf,

    /// Final CSV output
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Merged raw archives
    #[serde(rename = "archive-dir")]
    pub archive_dir: PathBuf,

    /// Log files
    #[serde(rename = "log-dir")]
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            interim_dir: PathBuf::from("data/interim"),
            output_dir: PathBuf::from("data/processed"),
            archive_dir: PathBuf::from("data/raw/archive"),
            log_dir: PathBuf::from("data/logs"),
        }
    }
}

/// Remote fetch behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total attempts per id, including the first
    pub attempts: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Per-request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
            timeout_ms: 10_000,
        }
    }
}

impl FetchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// What a run does when an id exhausts its fetch retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Abort the whole run
    #[default]
    Abort,
    /// Record the id as failed and continue
    Skip,
}

/// Run-scoped options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Only process the first N identifiers
    pub limit: Option<usize>,

    /// Keep per-id raw files after archiving
    #[serde(rename = "keep-raw")]
    pub keep_raw: bool,

    /// Archive and clean up at the end of every run
    #[serde(rename = "archive-after-run")]
    pub archive_after_run: bool,

    /// Behavior on exhausted fetch retries
    #[serde(rename = "on-fetch-error")]
    pub on_fetch_error: FetchFailurePolicy,
}

/// Overrides for both pipeline kinds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinesConfig {
    pub operations: PipelineConfig,
    pub rads: PipelineConfig,
}

/// Optional per-pipeline overrides; unset fields use the pipeline kind's defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reference table with the `nid` column
    #[serde(rename = "nids-csv")]
    pub nids_csv: Option<PathBuf>,

    /// Endpoint template; `{nid}` is replaced by the identifier
    pub endpoint: Option<String>,

    /// Request headers, replacing the defaults when set
    pub headers: Option<BTreeMap<String, String>>,

    /// YAML schema replacing the embedded one
    #[serde(rename = "schema-file")]
    pub schema_file: Option<PathBuf>,

    /// Secondary directory searched for cached raw documents
    #[serde(rename = "fallback-raw-dir")]
    pub fallback_raw_dir: Option<PathBuf>,
}

/// One cron entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Pipeline to run
    pub pipeline: PipelineKind,

    /// Cron expression (5-field crontab or 6/7-field with seconds)
    pub cron: String,
}
