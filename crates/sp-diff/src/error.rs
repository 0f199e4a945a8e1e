//! Error types for dump and comparison tooling

use thiserror::Error;

/// Diff tooling error types
#[derive(Error, Debug)]
pub enum DiffError {
    /// File read/write failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dump file contains something that is not a float
    #[error("Parse error in {path} line {line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },

    /// Compared dumps have different lengths
    #[error("Length mismatch: reference has {reference} values, candidate has {candidate}")]
    LengthMismatch { reference: usize, candidate: usize },

    /// Report serialization failure
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
}

/// Result type for diff operations
pub type DiffResult<T> = Result<T, DiffError>;
