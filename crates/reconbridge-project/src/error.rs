//! Error types for project state.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or changing project state.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// The clip path has no file name or parent directory.
    #[error("Cannot derive a project directory from clip '{0}'")]
    InvalidClip(PathBuf),

    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a file or directory.
    #[error("Failed to read '{path}': {source}")]
    Read {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to remove a directory.
    #[error("Failed to remove '{path}': {source}")]
    Remove {
        /// The path that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse JSON.
    #[error("Failed to parse '{path}': {source}")]
    ParseJson {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize JSON.
    #[error("Failed to serialize: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// A database operation failed.
    #[error("Database error in '{path}': {source}")]
    Database {
        /// The database file.
        path: PathBuf,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },
}

/// Result type for project operations.
pub type Result<T> = std::result::Result<T, ProjectError>;
