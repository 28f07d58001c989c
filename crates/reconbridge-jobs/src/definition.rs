//! The interface external work implements to be run as a job.

use crate::progress::{LogSink, ProgressChannel, ProgressReporter};
use crate::{BoxError, JobKind};

/// What a job gets to see while it prepares.
#[derive(Debug, Clone, Copy)]
pub struct JobContext<'a> {
    kind: &'a JobKind,
    log_sink: Option<&'a LogSink>,
}

impl<'a> JobContext<'a> {
    /// Creates a context.
    #[must_use]
    pub const fn new(kind: &'a JobKind, log_sink: Option<&'a LogSink>) -> Self {
        Self { kind, log_sink }
    }

    /// Returns the kind of the job being prepared.
    #[must_use]
    pub const fn kind(&self) -> &'a JobKind {
        self.kind
    }

    /// Returns the shared log sink, if the host configured one.
    #[must_use]
    pub const fn log_sink(&self) -> Option<&'a LogSink> {
        self.log_sink
    }
}

/// A unit of blocking work run through a [`JobRunner`](crate::JobRunner).
///
/// [`prepare`](Self::prepare) runs on the caller's thread and turns the
/// definition into owned arguments; [`execute`](Self::execute) then runs on a
/// dedicated background thread with only those arguments.
pub trait JobDefinition {
    /// Everything the background work needs, moved onto its thread.
    type Args: Send + 'static;

    /// The exclusion key for this job.
    fn kind(&self) -> JobKind;

    /// Human-readable title, shown next to the progress readout.
    fn label(&self) -> String {
        self.kind().to_string()
    }

    /// How the work reports progress.
    fn progress_channel(&self) -> ProgressChannel {
        ProgressChannel::Callback
    }

    /// Resolves paths and validates inputs before any work begins.
    ///
    /// # Errors
    ///
    /// Any error aborts the job before a thread is spawned.
    fn prepare(&self, context: &JobContext<'_>) -> Result<Self::Args, BoxError>;

    /// Performs the work. Runs on the job's background thread and may block.
    ///
    /// # Errors
    ///
    /// Any error marks the job failed with its message preserved.
    fn execute(args: Self::Args, progress: &ProgressReporter) -> Result<(), BoxError>;
}
