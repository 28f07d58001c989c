//! Progress sources: log tailing and direct callbacks.
//!
//! Work that exposes hooks reports through a [`ProgressReporter`]. Work that
//! only writes free text (an external tool, a chatty library) writes into the
//! shared [`LogSink`], and a [`LogTailer`] created for the job recovers
//! progress from the bytes appended after the job started.

mod callback;
mod patterns;
mod sink;
mod tail;

pub use callback::ProgressReporter;
pub use patterns::{
    DEFAULT_PHASE_PATTERN, DEFAULT_PROGRESS_PATTERN, LogPatterns, PatternError, ScanOutcome,
};
pub use sink::LogSink;
pub use tail::{LogTailer, TailUpdate};

use crate::StatusCell;

/// How a job definition reports its progress.
#[derive(Debug, Clone, Default)]
pub enum ProgressChannel {
    /// The work calls its [`ProgressReporter`] directly.
    #[default]
    Callback,
    /// The work writes into the shared log sink, scraped with these patterns.
    LogTail(LogPatterns),
}

/// The progress source wired to one running job.
#[derive(Debug)]
pub enum ProgressSource {
    /// Progress arrives through the job's reporter; nothing to drive.
    Callback,
    /// Progress is scraped from the log sink on every poll.
    LogTail(LogTailer),
}

impl ProgressSource {
    /// Drives the source once and applies what it found to `cell`.
    ///
    /// Runs on the polling thread.
    pub fn poll(&mut self, cell: &StatusCell) {
        let Self::LogTail(tailer) = self else {
            return;
        };

        let update = tailer.poll();
        if let Some((current, total)) = update.progress {
            cell.set_progress(current, total);
        }
        if let Some(phase) = update.phase {
            cell.set_message(phase);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_tail_source_updates_cell() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::create(temp_dir.path().join("sink.log")).unwrap();
        let cell = StatusCell::new();

        let mut source = ProgressSource::LogTail(sink.tailer(LogPatterns::default()));
        sink.append_line("------\nSparse reconstruction\n------").unwrap();
        sink.append_line("Registering [4/20]").unwrap();
        source.poll(&cell);

        let snapshot = cell.read();
        assert_eq!(snapshot.message, "Sparse reconstruction");
        assert_eq!((snapshot.current, snapshot.total), (4, 20));
    }

    #[test]
    fn test_callback_source_leaves_cell_alone() {
        let cell = StatusCell::new();
        cell.set_progress(2, 3);

        ProgressSource::Callback.poll(&cell);
        assert_eq!(cell.read().current, 2);
    }
}
