//! Direct progress reporting from inside the running work.

use crate::StatusCell;
use std::sync::Arc;

/// Handle that running work uses to push progress into its job's status.
///
/// Every call is a short, synchronous write under the status lock, cheap
/// enough to make once per processed item.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    cell: Arc<StatusCell>,
}

impl ProgressReporter {
    /// Creates a reporter writing into `cell`.
    #[must_use]
    pub const fn new(cell: Arc<StatusCell>) -> Self {
        Self { cell }
    }

    /// Reports `current` of `total` items done; a zero total is indeterminate.
    pub fn on_progress(&self, current: u64, total: u64) {
        self.cell.set_progress(current, total);
    }

    /// Reports the start of a named phase.
    pub fn on_phase(&self, name: impl Into<String>) {
        self.cell.set_message(name);
    }

    /// Reports one more item done.
    pub fn advance(&self) {
        self.cell.advance(1);
    }

    /// Sets the number of items expected, keeping the current count.
    pub fn set_total(&self, total: u64) {
        self.cell.set_total(total);
    }
}
