//! Error types for sheetnest.

use thiserror::Error;

/// Result type alias for sheetnest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during nesting operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid geometry provided (fewer than 3 points, fully collinear, ...).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Invalid sheet definition.
    #[error("Invalid sheet: {0}")]
    InvalidSheet(String),

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No-fit polygon computation failed.
    #[error("NFP computation failed: {0}")]
    Nfp(String),

    /// A worker failed while evaluating an individual.
    #[error("Worker failure: {0}")]
    Worker(String),

    /// NFP cache failure.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// Session used in the wrong lifecycle state.
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for errors that end a run without being a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidGeometry("only 2 points".into());
        assert_eq!(err.to_string(), "Invalid geometry: only 2 points");

        let err = Error::Worker("worker 3 panicked".into());
        assert_eq!(err.to_string(), "Worker failure: worker 3 panicked");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_cancelled());
        assert!(Error::Cancelled.is_cancelled());
    }
}
