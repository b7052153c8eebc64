// src/error.rs

//! Error types for recipe execution
//!
//! Every pipeline stage returns [`Error`]. The [`Kitchen`](crate::Kitchen)
//! never recovers from one; it tags the failure with the stage that was being
//! entered and hands the caller an [`ExecutionError`].

use crate::recipe::kitchen::Stage;
use std::io;
use std::path::PathBuf;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by pipeline stages
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to fetch {url}: {reason}")]
    FetchError { url: String, reason: String },

    #[error("failed to extract {archive}: {reason}")]
    ExtractError { archive: String, reason: String },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("invalid checksum '{checksum}': {reason}")]
    InvalidChecksum { checksum: String, reason: String },

    #[error("patch {index} ({url}) could not be fetched: {reason}")]
    PatchFetchError {
        index: usize,
        url: String,
        reason: String,
    },

    #[error("patch {index} ({url}) checksum mismatch: expected {expected}, got {actual}")]
    PatchChecksumError {
        index: usize,
        url: String,
        expected: String,
        actual: String,
    },

    #[error("patch {index} does not apply to {file}: {reason}")]
    PatchApplyError {
        index: usize,
        file: String,
        reason: String,
    },

    #[error("edit target does not exist: {}", path.display())]
    EditTargetMissing { path: PathBuf },

    #[error("pattern not found in {}: {pattern:?}", path.display())]
    EditPatternNotFound { path: PathBuf, pattern: String },

    #[error("command '{command}' failed: {reason}")]
    ExecError { command: String, reason: String },

    #[error("{}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    ParseError(String),

    #[error("execution cancelled")]
    Cancelled,
}

impl Error {
    /// Wrap an IO error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// The category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FetchError { .. } => ErrorKind::Fetch,
            Self::ExtractError { .. } => ErrorKind::Extract,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::InvalidChecksum { .. } => ErrorKind::InvalidChecksum,
            Self::PatchFetchError { .. } => ErrorKind::PatchFetch,
            Self::PatchChecksumError { .. } => ErrorKind::PatchChecksum,
            Self::PatchApplyError { .. } => ErrorKind::PatchApply,
            Self::EditTargetMissing { .. } => ErrorKind::EditTargetMissing,
            Self::EditPatternNotFound { .. } => ErrorKind::EditPatternNotFound,
            Self::ExecError { .. } => ErrorKind::Exec,
            Self::IoError { .. } => ErrorKind::Io,
            Self::ParseError(_) => ErrorKind::InvalidRecipe,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Error categories, one per [`Error`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Fetch,
    Extract,
    ChecksumMismatch,
    InvalidChecksum,
    PatchFetch,
    PatchChecksum,
    PatchApply,
    EditTargetMissing,
    EditPatternNotFound,
    Exec,
    Io,
    InvalidRecipe,
    Cancelled,
}

/// A failed recipe execution: the stage being entered and why it failed
#[derive(Error, Debug)]
#[error("{stage} failed ({kind}): {cause}")]
pub struct ExecutionError {
    /// Stage the pipeline was trying to reach
    pub stage: Stage,
    /// Category of the underlying error
    pub kind: ErrorKind,
    /// The underlying error
    #[source]
    pub cause: Error,
}

impl ExecutionError {
    /// Tag an error with the stage it happened in
    pub fn new(stage: Stage, cause: Error) -> Self {
        Self {
            stage,
            kind: cause.kind(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = Error::ChecksumMismatch {
            expected: "a".to_string(),
            actual: "b".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            Error::io("/tmp/x", io::Error::other("boom")).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn test_execution_error_display() {
        let err = ExecutionError::new(
            Stage::Built,
            Error::ExecError {
                command: "make".to_string(),
                reason: "exit code 2".to_string(),
            },
        );
        assert_eq!(err.kind, ErrorKind::Exec);
        assert_eq!(
            err.to_string(),
            "built failed (exec): command 'make' failed: exit code 2"
        );
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(ErrorKind::PatchApply.as_ref(), "patch_apply");
        assert_eq!(ErrorKind::EditPatternNotFound.to_string(), "edit_pattern_not_found");
    }
}
