//! errors.rs - Custom error types for the blackout-core library.
//!
//! Three enums cover the library surface:
//!
//! * [`BlackoutError`] for detector configuration and compilation.
//! * [`OpenError`] for documents that cannot be read or parsed.
//! * [`RedactionError`] for everything that can go wrong while a document
//!   is being scanned, committed or saved.
//!
//! License: MIT OR Apache-2.0

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, validating or compiling detectors.
///
/// `#[non_exhaustive]` so that new variants can be added without breaking
/// downstream matches.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BlackoutError {
    #[error("Failed to compile detector '{0}': {1}")]
    DetectorCompilationError(String, regex::Error),

    #[error("Detector '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("Failed to serialize report: {0}")]
    SerializationError(String),

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),

    #[error("A fatal error occurred: {0}")]
    Fatal(String),
}

/// The input document could not be opened.
///
/// Returned before any page is touched; no output is produced.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OpenError {
    #[error("Failed to read document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed PDF document: {0}")]
    Malformed(String),

    #[error("Document has no pages")]
    NoPages,
}

/// Failures of a redaction run.
///
/// A detected literal that cannot be located on the page is *not* an error;
/// it is reported in the run summary instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RedactionError {
    #[error(transparent)]
    Open(#[from] OpenError),

    #[error("Failed to extract text from page {page}: {message}")]
    Extraction { page: usize, message: String },

    #[error("Failed to commit redactions on page {page}: {message}")]
    Commit { page: usize, message: String },

    #[error("Deadline exceeded before page {next_page}; no output was written")]
    DeadlineExceeded { next_page: usize },

    #[error("Failed to save redacted document to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("An unexpected I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}

impl RedactionError {
    /// Page the error refers to, when there is one (zero-based).
    pub fn page(&self) -> Option<usize> {
        match self {
            RedactionError::Extraction { page, .. } | RedactionError::Commit { page, .. } => Some(*page),
            RedactionError::DeadlineExceeded { next_page } => Some(*next_page),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_converts_into_redaction_error() {
        let err: RedactionError = OpenError::Malformed("bad xref".to_string()).into();
        assert!(matches!(err, RedactionError::Open(OpenError::Malformed(_))));
        assert_eq!(err.to_string(), "Malformed PDF document: bad xref");
        assert_eq!(err.page(), None);
    }

    #[test]
    fn test_commit_error_reports_page() {
        let err = RedactionError::Commit { page: 3, message: "boom".to_string() };
        assert_eq!(err.page(), Some(3));
        assert!(err.to_string().contains("page 3"));
    }
}
