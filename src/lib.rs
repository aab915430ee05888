//! agedcare - aged care provider data pipelines
//!
//! Two pipelines, `operations` and `rads`, share one shape: load provider
//! identifiers from a reference table, fetch one JSON document per id
//! (cache first), flatten it into rows with a declarative field schema, and
//! write the rows as a dated CSV. Raw documents can then be merged into a
//! dated archive.
//!
//! # Modules
//!
//! - [`pipeline`] - Pipeline kinds, their defaults and embedded schemas
//! - [`fetch`] - Cache-first raw document fetching with bounded retry
//! - [`orchestrator`] - The batch run, coverage accounting and archiving
//! - [`reference`] - Identifier reference tables
//! - [`sink`] - CSV output
//! - [`scheduler`] - Cron-driven runs
//! - [`monitoring`] - Healthcheck and failure alerts
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod fetch;
pub mod monitoring;
pub mod orchestrator;
pub mod pipeline;
pub mod reference;
pub mod scheduler;
pub mod sink;
pub mod storage;

// Re-export commonly used types
pub use config::{Config, FetchFailurePolicy};
pub use fetch::{FetchError, HttpTransport, RetryPolicy, SourceFetcher, Transport};
pub use orchestrator::{
    ArchiveSummary, BatchOrchestrator, CoverageReport, PipelineError, RunOptions, RunPhase, RunSummary,
};
pub use pipeline::{Pipeline, PipelineKind};
pub use reference::ReferenceError;
pub use sink::CsvSink;
pub use storage::RunStamp;
