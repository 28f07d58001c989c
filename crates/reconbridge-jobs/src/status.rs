//! Job status state machine and the thread-safe status cell.

use crate::JobError;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lifecycle status of a job.
///
/// ```text
/// Starting -> Running -> Succeeded -> Finalized
///    |           \-----> Failed ----/
///    \-----------------> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobStatus {
    /// Exclusion acquired, preparation in progress.
    #[default]
    Starting,
    /// Work is running on its background thread.
    Running,
    /// Work returned normally.
    Succeeded,
    /// Preparation or work failed.
    Failed,
    /// The UI side cleaned up after the job.
    Finalized,
}

impl JobStatus {
    /// Returns true once the background work is over.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Finalized)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Starting, Self::Running | Self::Failed)
                | (Self::Running, Self::Succeeded | Self::Failed)
                | (Self::Succeeded | Self::Failed, Self::Finalized)
        )
    }

    /// Returns the status as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Finalized => "finalized",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time copy of a job's status record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSnapshot {
    /// Current status.
    pub status: JobStatus,
    /// Items completed so far.
    pub current: u64,
    /// Total items; zero means the total is unknown.
    pub total: u64,
    /// Human-readable phase label.
    pub message: String,
    /// Failure details once the job has failed.
    pub error: Option<JobError>,
}

impl JobSnapshot {
    /// Returns true if no total is known and a spinner should be shown.
    #[must_use]
    pub const fn is_indeterminate(&self) -> bool {
        self.total == 0
    }

    /// Returns the completed fraction in `0.0..=1.0`, if a total is known.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some((self.current.min(self.total) as f64) / self.total as f64)
    }
}

/// Mutex-guarded status record shared by a job's worker thread and its poller.
///
/// The worker writes progress and, last of all, the terminal status; the
/// poller only ever calls [`StatusCell::read`]. Every write takes the lock, so
/// all progress written before the terminal status is visible to a reader
/// that observes the terminal status.
#[derive(Debug, Default)]
pub struct StatusCell {
    record: Mutex<JobSnapshot>,
}

impl StatusCell {
    /// Creates a cell in the `Starting` state with indeterminate progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current record.
    pub fn read(&self) -> JobSnapshot {
        self.lock().clone()
    }

    /// Returns the current status.
    pub fn status(&self) -> JobStatus {
        self.lock().status
    }

    /// Sets both progress counters.
    pub fn set_progress(&self, current: u64, total: u64) {
        let mut record = self.lock();
        record.current = current;
        record.total = total;
    }

    /// Sets the progress total, leaving the current count alone.
    pub fn set_total(&self, total: u64) {
        self.lock().total = total;
    }

    /// Adds `by` to the current count.
    pub fn advance(&self, by: u64) {
        let mut record = self.lock();
        record.current = record.current.saturating_add(by);
    }

    /// Sets the phase label.
    pub fn set_message(&self, message: impl Into<String>) {
        self.lock().message = message.into();
    }

    /// Moves to `Running` and resets progress to the indeterminate `(0, 0)`.
    ///
    /// Returns false if the cell was not in `Starting`.
    pub fn mark_running(&self) -> bool {
        let mut record = self.lock();
        if !Self::transition(&mut record, JobStatus::Running) {
            return false;
        }
        record.current = 0;
        record.total = 0;
        true
    }

    /// Records the result of the work as the terminal status.
    ///
    /// Status and error are written under one lock acquisition.
    pub fn finish(&self, result: std::result::Result<(), JobError>) -> bool {
        let mut record = self.lock();
        match result {
            Ok(()) => Self::transition(&mut record, JobStatus::Succeeded),
            Err(err) => {
                let moved = Self::transition(&mut record, JobStatus::Failed);
                if moved {
                    record.error = Some(err);
                }
                moved
            }
        }
    }

    /// Moves a terminal job to `Finalized`.
    pub fn mark_finalized(&self) -> bool {
        let mut record = self.lock();
        Self::transition(&mut record, JobStatus::Finalized)
    }

    fn transition(record: &mut JobSnapshot, next: JobStatus) -> bool {
        if !record.status.can_transition_to(next) {
            tracing::warn!(from = %record.status, to = %next, "Ignoring invalid job transition");
            return false;
        }
        record.status = next;
        true
    }

    fn lock(&self) -> MutexGuard<'_, JobSnapshot> {
        // A panicking writer leaves plain counters behind; keep using them.
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
