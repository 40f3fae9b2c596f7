use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the NTL pipeline
///
/// Every variant is fatal for a run: nothing is retried and the output
/// document is only written once all stages have succeeded.
#[derive(Debug, Error)]
pub enum NtlError {
    /// Missing, unreadable or corrupt input file (raster or ward boundaries)
    #[error("cannot read {path:?}: {reason}")]
    DataAccess { path: PathBuf, reason: String },

    /// Raster and ward boundaries do not line up (CRS conflict or no overlap)
    #[error("raster and ward boundaries do not line up: {0}")]
    GeometryMismatch(String),

    /// Not enough distinct values to build the requested quantile classes
    #[error(
        "cannot build {classes} quantile classes from {distinct} distinct zonal means (bin edges must be unique)"
    )]
    ClassificationDegenerate { distinct: usize, classes: usize },

    /// The rendered map could not be written
    #[error("cannot write map to {path:?}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is unreadable or holds invalid values
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Inputs handed to a stage are inconsistent with each other
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl NtlError {
    pub fn data_access(path: &Path, reason: impl Into<String>) -> Self {
        NtlError::DataAccess {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn output_write(path: &Path, source: std::io::Error) -> Self {
        NtlError::OutputWrite {
            path: path.to_path_buf(),
            source,
        }
    }
}
