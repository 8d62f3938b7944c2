//! Error and warning types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building or analyzing a path tree.
#[derive(Debug, Error)]
pub enum DirdupeError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tree violates one of its structural invariants.
    #[error("Tree invariant violated: {message}")]
    Structural { message: String },

    /// Checkpoint file could not be used.
    #[error("Invalid checkpoint {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// Checkpoint payload does not match its recorded checksum.
    #[error("Checkpoint {path} failed its integrity check")]
    ChecksumMismatch { path: PathBuf },

    /// Checkpoint was written by an incompatible format version.
    #[error("Unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The external duplicate scanner failed.
    #[error("Duplicate scanner failed: {message}")]
    Scanner { message: String },

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DirdupeError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a structural invariant violation.
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
        }
    }

    /// Check whether this error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Kind of analysis warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Listing line that is not an absolute path.
    MalformedLine,
    /// Path that would turn a file into a directory or vice versa.
    KindConflict,
    /// Directory no longer exists; its subtree was detached.
    Vanished,
    /// Directory could not be listed.
    ReadError,
}

/// Non-fatal warning encountered while building or classifying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl AnalysisWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a malformed listing line warning.
    pub fn malformed_line(line_number: usize, line: &str) -> Self {
        Self {
            path: PathBuf::from(line),
            message: format!("Line {line_number} is not an absolute path"),
            kind: WarningKind::MalformedLine,
        }
    }

    /// Create a vanished directory warning.
    pub fn vanished(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Directory vanished: {}", path.display()),
            path,
            kind: WarningKind::Vanished,
        }
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, error: &DirdupeError) -> Self {
        Self {
            path: path.into(),
            message: format!("Read error: {error}"),
            kind: WarningKind::ReadError,
        }
    }
}
