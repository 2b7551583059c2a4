//! Error and result types for scanning.

use std::path::PathBuf;
use thiserror::Error;

use crate::summary::RunStats;

use super::Hit;

/// Errors that stop a single file from being scanned.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported encoding in {0}")]
    UnsupportedEncoding(PathBuf),
    #[error("{0} not found; create one with `todoon ignore` or pass --force")]
    MissingIgnoreFile(PathBuf),
    #[error("{0} already exists; pass --update to append to it")]
    IgnoreFileExists(PathBuf),
    #[error("invalid ignore pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Hits found by a scan, sorted by file and line, with the scan counters.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub hits: Vec<Hit>,
    pub stats: RunStats,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_hits(&self) -> bool {
        !self.hits.is_empty()
    }
}
