//! Raw document fetching
//!
//! Cache-first: a previously saved raw document for an id is returned without
//! touching the network. On a miss the templated endpoint is requested with
//! bounded retry, and the body is saved to the raw directory before returning.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::pipeline::{Pipeline, PipelineKind};
use crate::storage::{RunStamp, cached_nid, list_json, raw_file_name, write_json_atomic};

mod error;
mod retry;
mod transport;

pub use error::FetchError;
pub use retry::{RetryPolicy, Retryable, retry};
pub use transport::{HttpTransport, Transport};

/// Obtains one raw document per identifier
pub struct SourceFetcher {
    kind: PipelineKind,
    endpoint: String,
    headers: BTreeMap<String, String>,
    raw_dir: PathBuf,
    fallback_dir: Option<PathBuf>,
    policy: RetryPolicy,
    transport: Arc<dyn Transport>,
    stamp: RunStamp,
}

impl SourceFetcher {
    pub fn new(pipeline: &Pipeline, policy: RetryPolicy, transport: Arc<dyn Transport>, stamp: RunStamp) -> Self {
        debug!(pipeline = %pipeline.kind, ?policy, "SourceFetcher::new: called");
        Self {
            kind: pipeline.kind,
            endpoint: pipeline.endpoint.clone(),
            headers: pipeline.headers.clone(),
            raw_dir: pipeline.dirs.raw.clone(),
            fallback_dir: pipeline.fallback_raw_dir.clone(),
            policy,
            transport,
            stamp,
        }
    }

    /// Endpoint with the id substituted
    pub fn url_for(&self, nid: u64) -> String {
        self.endpoint.replace("{nid}", &nid.to_string())
    }

    /// Cached raw files for `nid`, raw dir first, then the fallback dir
    ///
    /// Archive files never match, whichever pipeline wrote them.
    pub fn cached_paths(&self, nid: u64) -> Vec<PathBuf> {
        std::iter::once(&self.raw_dir)
            .chain(self.fallback_dir.iter())
            .flat_map(|dir| list_json(dir))
            .filter(|path| cached_nid(path) == Some(nid))
            .collect()
    }

    /// First cached document for `nid` that parses
    pub fn load_cached(&self, nid: u64) -> Option<Value> {
        for path in self.cached_paths(nid) {
            let parsed = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).map_err(|e| e.to_string()));
            match parsed {
                Ok(doc) => {
                    info!(nid, path = %path.display(), "Loaded cached raw document");
                    return Some(doc);
                }
                Err(e) => {
                    warn!(nid, path = %path.display(), error = %e, "Ignoring unreadable cached raw document");
                }
            }
        }
        None
    }

    /// Fetch the raw document for `nid`, cache first
    pub async fn fetch(&self, nid: u64) -> Result<Value, FetchError> {
        if let Some(doc) = self.load_cached(nid) {
            return Ok(doc);
        }

        let url = self.url_for(nid);
        debug!(nid, %url, "fetch: cache miss, requesting");
        let label = format!("{} nid {}", self.kind, nid);
        let doc = retry(&self.policy, &label, |_| self.transport.get_json(&url, &self.headers)).await?;

        let path = self.raw_dir.join(raw_file_name(self.kind.name(), nid, &self.stamp));
        write_json_atomic(&path, &doc).map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })?;
        info!(nid, path = %path.display(), "Saved raw document");

        Ok(doc)
    }

    /// Fetch every id in order
    ///
    /// With `skip_failures` an id whose retries are exhausted is recorded in
    /// [`BulkFetch::failed`] and the rest are still fetched; otherwise the
    /// first failure stops the batch.
    pub async fn fetch_all(&self, nids: &[u64], skip_failures: bool) -> Result<BulkFetch, BulkFetchError> {
        let mut outcome = BulkFetch::default();
        for (idx, nid) in nids.iter().copied().enumerate() {
            info!("[{}/{}] Fetching {}", idx + 1, nids.len(), nid);
            match self.fetch(nid).await {
                Ok(_) => outcome.fetched += 1,
                Err(source) if skip_failures => {
                    warn!(nid, error = %source, "fetch_all: skipping id");
                    outcome.failed.push(nid);
                }
                Err(source) => return Err(BulkFetchError { nid, source }),
            }
        }
        Ok(outcome)
    }
}

/// Result of [`SourceFetcher::fetch_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkFetch {
    pub fetched: usize,
    pub failed: Vec<u64>,
}

/// The id that stopped a bulk fetch
#[derive(Debug, thiserror::Error)]
#[error("Fetch failed for nid {nid}: {source}")]
pub struct BulkFetchError {
    pub nid: u64,
    #[source]
    pub source: FetchError,
}
