//! Fetch error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while obtaining a raw document
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Transport failures and non-2xx responses are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { .. } => true,
            FetchError::InvalidJson(_) => false,
            FetchError::Io { .. } => false,
        }
    }
}
