//! Identifier reference table
//!
//! The reference table is a CSV with at least a `nid` column. Loading yields
//! the ordered, unique identifier list a run iterates over.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Column holding the identifiers
pub const NID_COLUMN: &str = "nid";

/// Cell values treated as "no identifier"
const NULL_MARKERS: &[&str] = &["nan", "null", "none"];

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Cannot open reference table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed reference table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Reference table {path} has no 'nid' column")]
    MissingColumn { path: PathBuf },

    #[error("Invalid identifier '{value}' on line {line}")]
    InvalidId { line: u64, value: String },
}

/// Load the ordered, de-duplicated identifier list from a reference table
pub fn load_ids(path: &Path) -> Result<Vec<u64>, ReferenceError> {
    debug!(path = %path.display(), "load_ids: called");
    let file = File::open(path).map_err(|source| ReferenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_err = |source| ReferenceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let column = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == NID_COLUMN)
        .ok_or_else(|| ReferenceError::MissingColumn {
            path: path.to_path_buf(),
        })?;

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let Some(nid) = parse_cell(record.get(column).unwrap_or(""), line)? else {
            dropped += 1;
            continue;
        };
        if seen.insert(nid) {
            ids.push(nid);
        } else {
            debug!(nid, line, "load_ids: duplicate identifier dropped");
        }
    }

    if dropped > 0 {
        warn!(dropped, path = %path.display(), "Reference table rows without an identifier");
    }
    info!(count = ids.len(), path = %path.display(), "Loaded identifiers");
    Ok(ids)
}

/// Truncate to the first `limit` identifiers, keeping order
pub fn apply_limit(mut ids: Vec<u64>, limit: Option<usize>) -> Vec<u64> {
    if let Some(limit) = limit
        && ids.len() > limit
    {
        info!(limit, total = ids.len(), "Limiting identifiers");
        ids.truncate(limit);
    }
    ids
}

/// `Ok(None)` for blank or null-marker cells
fn parse_cell(cell: &str, line: u64) -> Result<Option<u64>, ReferenceError> {
    let cell = cell.trim();
    if cell.is_empty() || NULL_MARKERS.contains(&cell.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }

    let invalid = || ReferenceError::InvalidId {
        line,
        value: cell.to_string(),
    };

    if let Ok(n) = cell.parse::<u64>() {
        return if n > 0 { Ok(Some(n)) } else { Err(invalid()) };
    }

    // Spreadsheet exports write integer columns with nulls as floats
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 1.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(invalid()),
    }
}
