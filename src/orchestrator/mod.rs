//! Batch orchestration
//!
//! One [`BatchOrchestrator`] drives one pipeline through
//! `Idle → LoadingIds → Iterating → Finalizing → Archiving → Done`:
//! load the identifier list, fetch and flatten each id in order with an
//! interim checkpoint per id, write the accumulated rows as one CSV, and
//! optionally archive raw files and purge checkpoints.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fieldpath::{FlatRow, flatten};
use serde_json::Value;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::{FetchFailurePolicy, RunConfig};
use crate::fetch::{BulkFetch, RetryPolicy, SourceFetcher, Transport};
use crate::pipeline::Pipeline;
use crate::reference::{apply_limit, load_ids};
use crate::sink::CsvSink;
use crate::storage::{RunStamp, interim_file_name, output_file_name, write_json_atomic};

mod archive;
mod coverage;
mod error;

pub use archive::{ArchiveSummary, archive_raw};
pub use coverage::CoverageReport;
pub use error::PipelineError;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    LoadingIds,
    Iterating { index: usize, total: usize },
    Finalizing,
    Archiving,
    Done,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::LoadingIds => write!(f, "loading-ids"),
            Self::Iterating { index, total } => write!(f, "iterating {}/{}", index + 1, total),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Archiving => write!(f, "archiving"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Options resolved once per run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Only process the first N identifiers
    pub limit: Option<usize>,
    /// Keep per-id raw files when archiving
    pub keep_raw: bool,
    /// Archive and clean up after the CSV is written
    pub archive: bool,
    pub on_fetch_error: FetchFailurePolicy,
}

impl RunOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            limit: config.limit,
            keep_raw: config.keep_raw,
            archive: config.archive_after_run,
            on_fetch_error: config.on_fetch_error,
        }
    }
}

/// Outcome of a full run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub coverage: CoverageReport,
    pub rows_written: usize,
    /// `None` when no rows were produced
    pub output: Option<PathBuf>,
    pub archive: Option<ArchiveSummary>,
}

/// Runs one pipeline's fetch → flatten → write cycle
pub struct BatchOrchestrator {
    pipeline: Pipeline,
    fetcher: SourceFetcher,
    sink: CsvSink,
    options: RunOptions,
    stamp: RunStamp,
    phase: RunPhase,
}

impl BatchOrchestrator {
    pub fn new(
        pipeline: Pipeline,
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        options: RunOptions,
        stamp: RunStamp,
    ) -> Self {
        debug!(pipeline = %pipeline.kind, ?options, stamp = %stamp.tag(), "BatchOrchestrator::new: called");
        let fetcher = SourceFetcher::new(&pipeline, policy, transport, stamp);
        Self {
            pipeline,
            fetcher,
            sink: CsvSink,
            options,
            stamp,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn stamp(&self) -> RunStamp {
        self.stamp
    }

    /// Dated CSV path for this run
    pub fn output_path(&self) -> PathBuf {
        self.pipeline.dirs.output.join(output_file_name(self.pipeline.name(), &self.stamp))
    }

    fn set_phase(&mut self, phase: RunPhase) {
        debug!(%phase, "phase");
        self.phase = phase;
    }

    /// Run the whole cycle once
    pub async fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let span = info_span!("pipeline", pipeline = %self.pipeline.kind);
        self.run_cycle().instrument(span).await
    }

    async fn run_cycle(&mut self) -> Result<RunSummary, PipelineError> {
        info!(stamp = %self.stamp.tag(), "Starting run");
        self.set_phase(RunPhase::LoadingIds);
        let ids = self.load_ids()?;
        for dir in self.pipeline.dirs.all() {
            fs::create_dir_all(dir).map_err(|source| PipelineError::io(dir, source))?;
        }

        let total = ids.len();
        let mut coverage = CoverageReport::new();
        let mut rows: Vec<FlatRow> = Vec::new();

        for (index, nid) in ids.into_iter().enumerate() {
            self.set_phase(RunPhase::Iterating { index, total });
            coverage.record_attempt(nid);

            info!("[{}/{}] Fetching {}", index + 1, total, nid);
            let document = match self.fetcher.fetch(nid).await {
                Ok(document) => document,
                Err(source) => match self.options.on_fetch_error {
                    FetchFailurePolicy::Abort => {
                        error!(nid, error = %source, "Fetch failed, aborting run");
                        return Err(PipelineError::Fetch { nid, source });
                    }
                    FetchFailurePolicy::Skip => {
                        error!(nid, error = %source, "Fetch failed, skipping id");
                        coverage.record_failure(nid);
                        continue;
                    }
                },
            };

            let parsed = flatten(&document, &self.pipeline.schema);
            self.checkpoint(nid, &parsed)?;
            if parsed.is_empty() {
                warn!(nid, "NID {} returned no data; skipping", nid);
            }
            coverage.record_rows(nid, &parsed);
            rows.extend(parsed);
        }

        self.set_phase(RunPhase::Finalizing);
        let path = self.output_path();
        let written = self
            .sink
            .write(&rows, &path)
            .map_err(|source| PipelineError::Csv {
                path: path.clone(),
                source,
            })?;
        coverage.log_summary();

        let archive = if self.options.archive {
            self.set_phase(RunPhase::Archiving);
            Some(self.archive(self.options.keep_raw)?)
        } else {
            None
        };

        self.set_phase(RunPhase::Done);
        info!(rows = rows.len(), "Run complete");
        Ok(RunSummary {
            coverage,
            rows_written: rows.len(),
            output: written.then_some(path),
            archive,
        })
    }

    /// Identifier list with the run limit applied
    pub fn load_ids(&self) -> Result<Vec<u64>, PipelineError> {
        let ids = load_ids(&self.pipeline.nids_csv)?;
        Ok(apply_limit(ids, self.options.limit))
    }

    /// Per-id interim checkpoint of the flattened rows
    fn checkpoint(&self, nid: u64, rows: &[FlatRow]) -> Result<(), PipelineError> {
        let path = self
            .pipeline
            .dirs
            .interim
            .join(interim_file_name(self.pipeline.name(), nid, &self.stamp));
        write_json_atomic(&path, rows).map_err(|source| PipelineError::io(&path, source))?;
        debug!(nid, path = %path.display(), "Checkpointed rows");
        Ok(())
    }

    /// Fetch every id into the raw cache without flattening
    pub async fn fetch_only(&mut self) -> Result<BulkFetch, PipelineError> {
        let span = info_span!("pipeline", pipeline = %self.pipeline.kind);
        async {
            self.set_phase(RunPhase::LoadingIds);
            let ids = self.load_ids()?;
            self.set_phase(RunPhase::Iterating { index: 0, total: ids.len() });
            let skip = self.options.on_fetch_error == FetchFailurePolicy::Skip;
            let outcome = self.fetcher.fetch_all(&ids, skip).await?;
            self.set_phase(RunPhase::Done);
            info!(fetched = outcome.fetched, failed = outcome.failed.len(), "Fetch complete");
            Ok::<_, PipelineError>(outcome)
        }
        .instrument(span)
        .await
    }

    /// Merge raw files into the dated archive and purge checkpoints
    pub fn archive(&self, keep_raw: bool) -> Result<ArchiveSummary, PipelineError> {
        let _span = info_span!("pipeline", pipeline = %self.pipeline.kind).entered();
        archive_raw(self.pipeline.name(), &self.pipeline.dirs, &self.stamp, keep_raw)
    }
}

/// Flatten one raw JSON file into `<interim>/<stem>_parsed.json`
///
/// Returns the checkpoint path and the number of rows.
pub fn parse_file(pipeline: &Pipeline, json_file: &Path) -> Result<(PathBuf, usize), PipelineError> {
    let bytes = fs::read(json_file).map_err(|source| PipelineError::io(json_file, source))?;
    let document: Value = serde_json::from_slice(&bytes).map_err(|source| PipelineError::Json {
        path: json_file.to_path_buf(),
        source,
    })?;

    let rows = flatten(&document, &pipeline.schema);
    info!(rows = rows.len(), file = %json_file.display(), "Parsed raw file");

    let stem = json_file.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
    let out = pipeline.dirs.interim.join(format!("{}_parsed.json", stem));
    write_json_atomic(&out, &rows).map_err(|source| PipelineError::io(&out, source))?;
    info!(path = %out.display(), "Saved parsed rows");
    Ok((out, rows.len()))
}

/// Write a JSON list of row objects to `<output>/<stem>.csv`
///
/// Returns the CSV path, or `None` when the list was empty.
pub fn write_records(pipeline: &Pipeline, records_file: &Path) -> Result<Option<PathBuf>, PipelineError> {
    let bytes = fs::read(records_file).map_err(|source| PipelineError::io(records_file, source))?;
    let rows: Vec<FlatRow> = serde_json::from_slice(&bytes).map_err(|source| PipelineError::Json {
        path: records_file.to_path_buf(),
        source,
    })?;

    let stem = records_file.file_stem().and_then(|s| s.to_str()).unwrap_or("records");
    let out = pipeline.dirs.output.join(format!("{}.csv", stem));
    let written = CsvSink
        .write(&rows, &out)
        .map_err(|source| PipelineError::Csv {
            path: out.clone(),
            source,
        })?;
    Ok(written.then_some(out))
}
