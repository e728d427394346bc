//! Error types for knn-truth.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side
//! is [`KnnTruthError`]. Structural violations (dimension mismatch, an id that
//! cannot be resolved) abort a run; recoverable conditions such as an
//! unreadable training shard are logged and never surface here.
//!
//! # Examples
//!
//! ```
//! use knn_truth::error::{KnnTruthError, Result};
//!
//! fn check(dimension: usize) -> Result<()> {
//!     if dimension == 0 {
//!         return Err(KnnTruthError::config("dimension must be positive"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(0).is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for knn-truth operations.
#[derive(Error, Debug)]
pub enum KnnTruthError {
    /// I/O errors (reading shards, writing output)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An embedding does not have the configured dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A record field is present but not in the expected shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Filter clause parsing errors
    #[error("Filter error: {0}")]
    Filter(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Dataset selector matched none of the known schemas
    #[error("Unknown dataset name: {0}")]
    UnknownDataset(String),

    /// Thread join errors
    #[error("Thread join error: {0}")]
    ThreadJoinError(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with KnnTruthError.
pub type Result<T> = std::result::Result<T, KnnTruthError>;

impl KnnTruthError {
    /// Create a new dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        KnnTruthError::DimensionMismatch { expected, actual }
    }

    /// Create a new invalid format error.
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        KnnTruthError::InvalidFormat(msg.into())
    }

    /// Create a new filter error.
    pub fn filter<S: Into<String>>(msg: S) -> Self {
        KnnTruthError::Filter(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        KnnTruthError::Config(msg.into())
    }

    /// Create a new unknown dataset error.
    pub fn unknown_dataset<S: Into<String>>(name: S) -> Self {
        KnnTruthError::UnknownDataset(name.into())
    }

    /// Create a new thread join error.
    pub fn thread_join<S: Into<String>>(msg: S) -> Self {
        KnnTruthError::ThreadJoinError(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        KnnTruthError::Other(format!("Internal error: {}", msg.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = KnnTruthError::dimension_mismatch(4, 3);
        assert_eq!(error.to_string(), "Dimension mismatch: expected 4, got 3");

        let error = KnnTruthError::invalid_format("id(12) is invalid");
        assert_eq!(error.to_string(), "Invalid format: id(12) is invalid");

        let error = KnnTruthError::unknown_dataset("/data/foo");
        assert_eq!(error.to_string(), "Unknown dataset name: /data/foo");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = KnnTruthError::from(io_error);

        match error {
            KnnTruthError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }
}
