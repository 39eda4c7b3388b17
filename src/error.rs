// THEORY:
// Every failure in the engine is local and non-fatal. These types exist so the
// few operations that touch the outside world (files, caller-supplied buffers)
// can say what went wrong; the frame pipeline itself never returns an error.

use std::path::PathBuf;
use thiserror::Error;

/// Raised when a caller hands over a buffer that does not match its declared size.
#[derive(Debug, Error, PartialEq)]
pub enum DistanceMapError {
    #[error("distance buffer holds {actual} values but {width}x{height} needs {expected}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Failures while reading or writing the labeled gesture dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset stream I/O failed: {0}")]
    Stream(#[from] std::io::Error),

    #[error("unexpected dataset header: {found:?}")]
    Header { found: String },
}

/// Failures while loading a pipeline configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
