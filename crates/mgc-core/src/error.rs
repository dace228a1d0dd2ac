//! Error types for clone rounds.
//!
//! Per-job failures (`CloneError`) are captured in a `CloneResult` and never
//! abort the pool. Only a `PreconditionError` stops a whole round.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// High-level classification used for summaries and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Destination entry was present before the clone started.
    AlreadyExists,
    /// The external tool failed, timed out, or the target was unusable.
    Execution,
}

/// Diagnostic from one external tool invocation (exit status plus stderr).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure of a single clone or update job.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("directory already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("{source}")]
    Execution {
        #[source]
        source: ToolError,
    },

    #[error("timed out after {}s", .after.as_secs())]
    TimedOut { after: Duration },

    #[error("not a git repository: {}", .path.display())]
    NotARepository { path: PathBuf },

    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CloneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CloneError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            CloneError::Execution { .. }
            | CloneError::TimedOut { .. }
            | CloneError::NotARepository { .. }
            | CloneError::Io { .. } => ErrorKind::Execution,
        }
    }
}

/// Failure that prevents a round from starting at all. Never retried.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("git is not installed or not available in PATH: {0}")]
    ToolUnavailable(String),

    #[error("failed to create target directory {}: {source}", .path.display())]
    TargetDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no repositories to clone")]
    NothingSelected,
}
