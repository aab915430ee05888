//! Working-file layout and naming
//!
//! ```text
//! data/
//! ├── raw/<pipeline>/<pipeline>_<nid>_<dd_mm_yyyy>.json          # raw cache
//! ├── raw/archive/<pipeline>/<pipeline>_all_raw_<dd_mm_yyyy>.json
//! ├── interim/<pipeline>/<pipeline>_<nid>_<dd_mm_yyyy>_parsed.json
//! └── processed/<pipeline>/<pipeline>_<dd_mm_yyyy>.csv
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::config::PathsConfig;
use crate::pipeline::PipelineKind;

/// Date stamp embedded in every file name of a run, captured once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStamp(NaiveDate);

impl RunStamp {
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// `dd_mm_yyyy`
    pub fn tag(&self) -> String {
        self.0.format("%d_%m_%Y").to_string()
    }
}

/// Directories for one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDirs {
    pub raw: PathBuf,
    pub interim: PathBuf,
    pub output: PathBuf,
    pub archive: PathBuf,
}

impl PipelineDirs {
    pub fn new(kind: PipelineKind, paths: &PathsConfig) -> Self {
        let name = kind.name();
        Self {
            raw: paths.raw_dir.join(name),
            interim: paths.interim_dir.join(name),
            output: paths.output_dir.join(name),
            archive: paths.archive_dir.join(name),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [&self.raw, &self.interim, &self.output, &self.archive]
    }
}

pub fn raw_file_name(pipeline: &str, nid: u64, stamp: &RunStamp) -> String {
    format!("{}_{}_{}.json", pipeline, nid, stamp.tag())
}

pub fn interim_file_name(pipeline: &str, nid: u64, stamp: &RunStamp) -> String {
    format!("{}_{}_{}_parsed.json", pipeline, nid, stamp.tag())
}

pub fn output_file_name(pipeline: &str, stamp: &RunStamp) -> String {
    format!("{}_{}.csv", pipeline, stamp.tag())
}

/// Marker in every archive file name, with or without a pipeline prefix
const ARCHIVE_MARKER: &str = "all_raw_";

/// Prefix shared by every archive file of a pipeline
pub fn archive_prefix(pipeline: &str) -> String {
    format!("{}_{}", pipeline, ARCHIVE_MARKER)
}

/// Merged archive of any pipeline, including bare `all_raw_<date>.json`
pub fn is_archive_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.contains(ARCHIVE_MARKER))
}

pub fn archive_file_name(pipeline: &str, stamp: &RunStamp) -> String {
    format!("{}{}.json", archive_prefix(pipeline), stamp.tag())
}

/// Identifier a cached raw file belongs to: the first all-digit `_` token of its stem
///
/// `operations_12345_17_10_2026.json` and `12345_20250101.json` both belong to 12345.
/// Archive files belong to no identifier.
pub fn cached_nid(path: &Path) -> Option<u64> {
    if is_archive_file(path) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.split('_')
        .find(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|token| token.parse().ok())
}

/// `*.json` files directly inside `dir`, sorted by name; a missing dir is empty
pub fn list_json(dir: &Path) -> Vec<PathBuf> {
    let Some(dir) = dir.to_str() else {
        return Vec::new();
    };
    let pattern = format!("{}/*.json", glob::Pattern::escape(dir));
    let mut paths: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(entries) => entries.filter_map(|e| e.ok()).filter(|p| p.is_file()).collect(),
        Err(_) => Vec::new(),
    };
    paths.sort();
    paths
}

/// Leftover `*.part` files from interrupted writes
pub fn list_partial(dir: &Path) -> Vec<PathBuf> {
    let Some(dir) = dir.to_str() else {
        return Vec::new();
    };
    let pattern = format!("{}/*.part", glob::Pattern::escape(dir));
    match glob::glob(&pattern) {
        Ok(entries) => entries.filter_map(|e| e.ok()).filter(|p| p.is_file()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Write pretty JSON via a `.part` sibling and rename into place
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);
    fs::write(&part, body)?;
    fs::rename(&part, path)
}
