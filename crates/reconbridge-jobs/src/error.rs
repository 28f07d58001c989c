//! Error types for job execution.

use crate::JobKind;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by job preparation and execution steps.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for job operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors a job can end with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// A job of the same kind is already running.
    #[error("A '{kind}' job is already running")]
    AlreadyRunning {
        /// The kind that was busy.
        kind: JobKind,
    },

    /// The job's inputs could not be prepared; no work was started.
    #[error("Preparation failed: {0}")]
    Preparation(String),

    /// The external work failed after it started.
    #[error("Execution failed: {message}")]
    Execution {
        /// Message of the underlying failure.
        message: String,
        /// Exit code of the external process, if there was one.
        exit_code: Option<i32>,
    },
}

impl JobError {
    /// Creates an execution error without an exit code.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            exit_code: None,
        }
    }

    /// Returns the exit code of a failed external process.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Execution { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Returns a short machine-readable name for the error class.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyRunning { .. } => "already_running",
            Self::Preparation(_) => "preparation",
            Self::Execution { .. } => "execution",
        }
    }
}

/// Errors raised while opening or writing the shared log sink.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Failed to create the sink's parent directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to open the sink file.
    #[error("Failed to open log sink '{path}': {source}")]
    Open {
        /// The sink path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to append to the sink file.
    #[error("Failed to write log sink '{path}': {source}")]
    Write {
        /// The sink path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_only_on_execution() {
        let err = JobError::Execution {
            message: "mapper crashed".to_string(),
            exit_code: Some(3),
        };
        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(JobError::Preparation("bad".into()).exit_code(), None);
    }

    #[test]
    fn test_messages() {
        let busy = JobError::AlreadyRunning {
            kind: JobKind::from_static("solve"),
        };
        assert_eq!(busy.to_string(), "A 'solve' job is already running");
        assert_eq!(busy.as_str(), "already_running");
        assert_eq!(
            JobError::execution("boom").to_string(),
            "Execution failed: boom"
        );
    }
}
