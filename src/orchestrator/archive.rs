//! Raw archive and working-file cleanup

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::PipelineError;
use crate::storage::{PipelineDirs, RunStamp, archive_file_name, is_archive_file, list_json, list_partial, write_json_atomic};

/// What an archive pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Dated archive file that was written
    pub archive: PathBuf,
    /// Raw documents in this pass's archive
    pub merged: usize,
    pub raw_deleted: usize,
    pub interim_deleted: usize,
    /// Leftover `.part` files from interrupted writes
    pub partial_deleted: usize,
    /// Raw files that could not be read; left in place
    pub skipped: Vec<PathBuf>,
}

/// Merge per-id raw documents into one dated archive, then clean up
///
/// Merged raw files are deleted unless `keep_raw`; interim checkpoints are
/// always purged, as are `.part` leftovers in both directories. Unreadable raw
/// files are skipped and left on disk. Individual delete failures are logged
/// and do not stop the pass. The archive is rebuilt from the raw files present
/// now, replacing any archive written under the same stamp.
pub fn archive_raw(
    pipeline: &str,
    dirs: &PipelineDirs,
    stamp: &RunStamp,
    keep_raw: bool,
) -> Result<ArchiveSummary, PipelineError> {
    debug!(pipeline, keep_raw, "archive_raw: called");
    let raw_paths: Vec<PathBuf> = list_json(&dirs.raw)
        .into_iter()
        .filter(|p| !is_archive_file(p))
        .collect();

    let archive = dirs.archive.join(archive_file_name(pipeline, stamp));
    let mut documents = Vec::new();
    let mut merged_paths = Vec::new();
    let mut skipped = Vec::new();
    for path in raw_paths {
        match read_json(&path) {
            Ok(doc) => {
                documents.push(doc);
                merged_paths.push(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable raw file");
                skipped.push(path);
            }
        }
    }

    write_json_atomic(&archive, &documents).map_err(|source| PipelineError::io(&archive, source))?;
    let merged = merged_paths.len();
    info!(merged, archive = %archive.display(), "Merged raw files");

    let raw_deleted = if keep_raw {
        info!(kept = merged, "Keeping per-id raw files");
        0
    } else {
        let deleted = remove_all(&merged_paths);
        info!(deleted, "Deleted per-id raw files");
        deleted
    };

    let interim_deleted = remove_all(&list_json(&dirs.interim));
    info!(deleted = interim_deleted, "Deleted interim files");

    let partials: Vec<PathBuf> = list_partial(&dirs.raw).into_iter().chain(list_partial(&dirs.interim)).collect();
    let partial_deleted = remove_all(&partials);
    if partial_deleted > 0 {
        info!(deleted = partial_deleted, "Deleted leftover partial files");
    }

    Ok(ArchiveSummary {
        archive,
        merged,
        raw_deleted,
        interim_deleted,
        partial_deleted,
        skipped,
    })
}

fn read_json(path: &Path) -> Result<Value, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

/// Best-effort delete; returns how many files were removed
fn remove_all(paths: &[PathBuf]) -> usize {
    paths
        .iter()
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete file");
                false
            }
        })
        .count()
}
