//! Unified application error types for FileDepot.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Each [`ErrorKind`] renders as a
//! stable machine-readable code so callers can branch on failure class
//! without string matching.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Writing to the blob store failed (I/O failure, torn stream, rejected write).
    BlobWrite,
    /// Reading from the blob store failed.
    BlobRead,
    /// No blob exists under the given content identifier.
    BlobNotFound,
    /// Flushing or committing staged metadata changes failed.
    MetadataCommit,
    /// A metadata record required by the operation does not exist.
    MetadataNotFound,
    /// A caller-supplied argument was rejected before any store was touched.
    InvalidArgument,
    /// A database error occurred outside the commit path (reads, connectivity).
    Database,
    /// A configuration error occurred.
    Configuration,
    /// An internal invariant was violated or an unexpected state was reached.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlobWrite => write!(f, "BLOB_WRITE"),
            Self::BlobRead => write!(f, "BLOB_READ"),
            Self::BlobNotFound => write!(f, "BLOB_NOT_FOUND"),
            Self::MetadataCommit => write!(f, "METADATA_COMMIT"),
            Self::MetadataNotFound => write!(f, "METADATA_NOT_FOUND"),
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout FileDepot.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a blob-write error.
    pub fn blob_write(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BlobWrite, message)
    }

    /// Create a blob-read error.
    pub fn blob_read(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BlobRead, message)
    }

    /// Create a blob-not-found error.
    pub fn blob_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BlobNotFound, message)
    }

    /// Create a metadata-commit error.
    pub fn metadata_commit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MetadataCommit, message)
    }

    /// Create a metadata-not-found error.
    pub fn metadata_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MetadataNotFound, message)
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_stable_code() {
        let err = AppError::blob_not_found("no blob under id");
        assert_eq!(err.to_string(), "BLOB_NOT_FOUND: no blob under id");
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::BlobWrite.to_string(), "BLOB_WRITE");
        assert_eq!(ErrorKind::BlobRead.to_string(), "BLOB_READ");
        assert_eq!(ErrorKind::BlobNotFound.to_string(), "BLOB_NOT_FOUND");
        assert_eq!(ErrorKind::MetadataCommit.to_string(), "METADATA_COMMIT");
        assert_eq!(ErrorKind::MetadataNotFound.to_string(), "METADATA_NOT_FOUND");
        assert_eq!(ErrorKind::InvalidArgument.to_string(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_with_source_preserves_cause() {
        let io = std::io::Error::other("disk on fire");
        let err = AppError::with_source(ErrorKind::BlobWrite, "chunk write failed", io);
        assert_eq!(err.kind, ErrorKind::BlobWrite);
        let source = std::error::Error::source(&err).expect("source present");
        assert!(source.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::other("gone");
        let err = AppError::with_source(ErrorKind::BlobRead, "read failed", io);
        let cloned = err.clone();
        assert_eq!(cloned.kind, err.kind);
        assert_eq!(cloned.message, err.message);
        assert!(cloned.source.is_none());
    }
}
