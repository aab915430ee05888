//! Orchestrator error types

use std::path::PathBuf;

use thiserror::Error;

use crate::fetch::{BulkFetchError, FetchError};
use crate::reference::ReferenceError;

/// Errors that end a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("Fetch failed for nid {nid}: {source}")]
    Fetch {
        nid: u64,
        #[source]
        source: FetchError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<BulkFetchError> for PipelineError {
    fn from(e: BulkFetchError) -> Self {
        Self::Fetch {
            nid: e.nid,
            source: e.source,
        }
    }
}
