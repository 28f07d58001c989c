//! The shared append-only log sink.

use crate::progress::{LogPatterns, LogTailer};
use crate::SinkError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result type for sink operations.
pub(crate) type Result<T> = std::result::Result<T, SinkError>;

/// A single append-only text file that external work writes its output to.
///
/// Created once at process start. Writers get their own append-mode handles,
/// so output from a subprocess lands at the end of the file no matter who
/// else is writing. Readers are [`LogTailer`]s, which only read forward from
/// the offset at which they were created.
#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    /// Opens (creating if needed) the sink at `path`.
    ///
    /// Existing content is kept; tailers ignore it anyway.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or the file cannot be created.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent).map_err(|e| SinkError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let sink = Self { path };
        sink.writer()?;
        tracing::debug!(path = %sink.path.display(), "Opened log sink");
        Ok(sink)
    }

    /// Returns the sink's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a new append-mode handle, e.g. for a child's stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn writer(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::Open {
                path: self.path.clone(),
                source: e,
            })
    }

    /// Appends one line of text.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append_line(&self, line: &str) -> Result<()> {
        let mut file = self.writer()?;
        writeln!(file, "{line}").map_err(|e| SinkError::Write {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Returns the current length of the sink in bytes (zero if unreadable).
    #[must_use]
    pub fn len(&self) -> u64 {
        std::fs::metadata(&self.path).map_or(0, |m| m.len())
    }

    /// Returns true if nothing has been written to the sink.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates a tailer that reads from the current end of the sink.
    #[must_use]
    pub fn tailer(&self, patterns: LogPatterns) -> LogTailer {
        LogTailer::new(self.path.clone(), patterns)
    }
}
