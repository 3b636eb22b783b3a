//! Error types of the extraction pipeline and batch runner

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::tiff::errors::TiffError;

/// Pipeline and batch errors
#[derive(Debug, Error)]
pub enum ExtentError {
    /// Raster unreadable or not a valid grid
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: TiffError,
    },
    /// Missing or unusable spatial reference, or invalid reprojection
    #[error("projection error: {0}")]
    Projection(String),
    /// Results table cannot be created or appended to
    #[error("storage error on {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),
    /// Input pattern invalid or unreadable
    #[error("input discovery failed: {0}")]
    Discovery(String),
    /// Batch stopped before all inputs were processed
    #[error("batch cancelled")]
    Cancelled,
}

/// Result type for pipeline operations
pub type ExtentResult<T> = Result<T, ExtentError>;

impl ExtentError {
    pub fn decode(path: impl AsRef<Path>, source: TiffError) -> Self {
        ExtentError::Decode {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn storage(path: impl AsRef<Path>, source: io::Error) -> Self {
        ExtentError::Storage {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Errors that end a batch instead of being recorded per file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExtentError::Storage { .. } | ExtentError::Config(_) | ExtentError::Discovery(_) | ExtentError::Cancelled
        )
    }
}
