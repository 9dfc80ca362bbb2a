//! Error types for lero
//!
//! Every error message is one line and names the offending path where one
//! exists, so a partially applied operation can be reconciled by hand.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Lero error types
#[derive(Error, Debug)]
pub enum Error {
    /// A required directory or file is missing from the dataset tree
    #[error("invalid dataset structure: missing {path}")]
    InvalidDatasetStructure {
        /// Path of the missing directory or file
        path: PathBuf,
    },

    /// A sidecar metadata file failed to parse
    #[error("malformed metadata in {path}: {detail}")]
    MalformedMetadata {
        /// Metadata file that failed to parse
        path: PathBuf,
        /// Parser diagnostic
        detail: String,
    },

    /// info.json lacks a mandatory scalar field
    #[error("missing required field `{field}` in {path}")]
    MissingRequiredField {
        /// Name of the absent field
        field: String,
        /// The info.json that lacks it
        path: PathBuf,
    },

    /// Episode index outside the current contiguous range
    #[error("episode index {index} out of range (0-{max})")]
    IndexOutOfRange {
        /// The rejected index
        index: usize,
        /// Largest valid index
        max: usize,
    },

    /// Copy requires a non-empty instruction string
    #[error("a non-empty instruction is required")]
    InstructionEmpty,

    /// Malformed or inverted frame-range specification
    #[error("invalid frame range `{0}`: expected start:end with end >= start")]
    InvalidRange(String),

    /// Include and exclude feature filters supplied together
    #[error("include and exclude feature filters are mutually exclusive")]
    MutuallyExclusiveOptions,

    /// Filesystem operation failed, with the offending path
    #[error("filesystem error at {path}: {source}")]
    FileSystem {
        /// Path the failed operation acted on
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// An episode data file failed to parse as parquet
    #[error("corrupt data file {path}: {detail}")]
    DataFileCorrupt {
        /// The unreadable parquet file
        path: PathBuf,
        /// Parser diagnostic
        detail: String,
    },

    /// IO error with no more specific path context
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON serialization error outside metadata parsing
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach a path to a raw I/O error.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }
}
