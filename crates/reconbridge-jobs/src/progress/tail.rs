//! Incremental reader that scrapes progress from newly appended log bytes.

use crate::progress::LogPatterns;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Pending bytes are trimmed once they grow past this size.
const MAX_PENDING: usize = 64 * 1024;

/// Bytes kept after trimming an oversized pending buffer.
const KEEP_PENDING: usize = 4 * 1024;

/// Progress information recovered by one [`LogTailer::poll`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailUpdate {
    /// Latest `(current, total)` seen in the new bytes.
    pub progress: Option<(u64, u64)>,
    /// Latest phase name seen in the new bytes.
    pub phase: Option<String>,
}

impl TailUpdate {
    /// Returns true if nothing was recovered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.progress.is_none() && self.phase.is_none()
    }
}

/// Reads a shared log file forward from the offset it was created at.
///
/// Bytes that do not match either pattern are kept and rescanned together
/// with the next read, so a progress line split across two reads is still
/// recognised exactly once.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    read_offset: u64,
    pending: Vec<u8>,
    patterns: LogPatterns,
}

impl LogTailer {
    /// Creates a tailer positioned at the current end of `path`.
    ///
    /// A file that does not exist yet is tailed from its start.
    #[must_use]
    pub fn new(path: PathBuf, patterns: LogPatterns) -> Self {
        let read_offset = std::fs::metadata(&path).map_or(0, |m| m.len());
        Self::from_offset(path, read_offset, patterns)
    }

    /// Creates a tailer positioned at an explicit offset.
    #[must_use]
    pub const fn from_offset(path: PathBuf, read_offset: u64, patterns: LogPatterns) -> Self {
        Self {
            path,
            read_offset,
            pending: Vec::new(),
            patterns,
        }
    }

    /// Returns the tailed file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the offset the next read starts at.
    #[must_use]
    pub const fn read_offset(&self) -> u64 {
        self.read_offset
    }

    /// Returns the bytes retained for the next scan.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Reads everything appended since the last poll and scans it.
    ///
    /// Never fails: an unreadable file skips this tick, and a file that
    /// shrank below the read offset is treated as rotated and resynced to
    /// its new end.
    pub fn poll(&mut self) -> TailUpdate {
        match self.read_new_bytes() {
            Ok(Some(bytes)) => self.feed(&bytes),
            Ok(None) => TailUpdate::default(),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Skipping unreadable log sink");
                TailUpdate::default()
            }
        }
    }

    /// Appends `bytes` to the pending buffer and scans it.
    pub fn feed(&mut self, bytes: &[u8]) -> TailUpdate {
        self.pending.extend_from_slice(bytes);

        let outcome = self.patterns.scan(&self.pending);
        self.pending.drain(..outcome.consumed);

        if self.pending.len() > MAX_PENDING {
            let excess = self.pending.len() - KEEP_PENDING;
            self.pending.drain(..excess);
        }

        TailUpdate {
            progress: outcome.progress,
            phase: outcome.phase,
        }
    }

    fn read_new_bytes(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();

        if len < self.read_offset {
            tracing::debug!(
                path = %self.path.display(),
                offset = self.read_offset,
                len,
                "Log sink shrank, resyncing to its end"
            );
            self.read_offset = len;
            self.pending.clear();
            return Ok(None);
        }
        if len == self.read_offset {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(self.read_offset))?;
        let mut bytes = Vec::with_capacity((len - self.read_offset) as usize);
        file.read_to_end(&mut bytes)?;
        self.read_offset += bytes.len() as u64;

        Ok(Some(bytes))
    }
}
