//! The poller that connects running jobs to the user interface.

use crate::definition::JobDefinition;
use crate::progress::LogSink;
use crate::registry::ExclusionRegistry;
use crate::runner::{JobId, JobOutcome, JobRunner};
use crate::status::JobSnapshot;
use crate::timer::RepeatingTimer;
use crate::{JobError, JobKind, Result};
use std::time::Duration;

/// The surface a [`UiBridge`] draws on.
///
/// Every method is called on the polling thread.
pub trait ProgressView {
    /// A job was started and is now tracked.
    fn job_started(&mut self, runner: &JobRunner);

    /// The latest status of a tracked job, once per tick.
    fn job_progress(&mut self, id: JobId, snapshot: &JobSnapshot);

    /// A job was finalized; its progress readout should go away.
    fn job_finished(&mut self, outcome: &JobOutcome);

    /// A user-visible warning, such as a rejected start.
    fn warn(&mut self, message: &str);
}

/// Hook run once after a job is finalized, whatever its result.
pub type FinishedHook = Box<dyn FnOnce(&JobOutcome)>;

struct TrackedJob {
    runner: JobRunner,
    on_finished: Option<FinishedHook>,
}

impl std::fmt::Debug for TrackedJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedJob")
            .field("runner", &self.runner)
            .field("on_finished", &self.on_finished.is_some())
            .finish()
    }
}

/// Starts jobs, polls them on a repeating timer and finalizes each exactly
/// once.
///
/// The bridge is the only component that touches the view. Jobs of different
/// kinds can be tracked at the same time.
#[derive(Debug)]
pub struct UiBridge<V> {
    registry: ExclusionRegistry,
    sink: Option<LogSink>,
    view: V,
    timer: RepeatingTimer,
    active: Vec<TrackedJob>,
    finished: Vec<JobOutcome>,
}

impl<V: ProgressView> UiBridge<V> {
    /// Creates a bridge drawing on `view`.
    #[must_use]
    pub fn new(registry: ExclusionRegistry, view: V) -> Self {
        Self {
            registry,
            sink: None,
            view,
            timer: RepeatingTimer::default(),
            active: Vec::new(),
            finished: Vec::new(),
        }
    }

    /// Sets the shared log sink handed to jobs that tail it.
    #[must_use]
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the polling period.
    #[must_use]
    pub fn with_poll_interval(mut self, period: Duration) -> Self {
        self.timer = RepeatingTimer::new(period);
        self
    }

    /// Starts a job and begins tracking it.
    ///
    /// A busy kind is rejected with a warning on the view and no state
    /// change; `on_finished` is dropped uncalled. Otherwise `on_finished`
    /// runs exactly once: after the job is finalized, on success and on
    /// failure alike, or right away with a failed outcome if the job could
    /// not be prepared.
    ///
    /// # Errors
    ///
    /// Returns the error [`JobRunner::start`] failed with.
    pub fn start<D, F>(&mut self, definition: &D, on_finished: F) -> Result<JobId>
    where
        D: JobDefinition + ?Sized + 'static,
        F: FnOnce(&JobOutcome) + 'static,
    {
        let kind = definition.kind();
        if self.registry.is_busy(&kind) {
            return Err(self.reject(JobError::AlreadyRunning { kind }));
        }

        match JobRunner::start(definition, &self.registry, self.sink.as_ref()) {
            Ok(runner) => {
                let id = runner.id();
                self.view.job_started(&runner);
                self.active.push(TrackedJob {
                    runner,
                    on_finished: Some(Box::new(on_finished)),
                });
                Ok(id)
            }
            Err(err @ JobError::AlreadyRunning { .. }) => Err(self.reject(err)),
            Err(err) => {
                let err = self.reject(err);
                let outcome = JobOutcome::not_started(kind, definition.label(), err.clone());
                on_finished(&outcome);
                Err(err)
            }
        }
    }

    /// Polls every tracked job once, finalizing those that reached a
    /// terminal status.
    ///
    /// Returns true while any job is still tracked.
    pub fn tick(&mut self) -> bool {
        for mut job in std::mem::take(&mut self.active) {
            let poll = job.runner.poll();
            self.view.job_progress(job.runner.id(), &poll.snapshot);

            if poll.keep_polling {
                self.active.push(job);
                continue;
            }

            match job.runner.finalize() {
                Ok(outcome) => {
                    self.view.job_finished(&outcome);
                    if let Some(hook) = job.on_finished.take() {
                        hook(&outcome);
                    }
                    self.finished.push(outcome);
                }
                Err(runner) => {
                    job.runner = runner;
                    self.active.push(job);
                }
            }
        }

        !self.active.is_empty()
    }

    /// Ticks on the bridge's timer until no job is tracked, then returns
    /// the outcomes finalized since the last call.
    pub async fn run(&mut self) -> Vec<JobOutcome> {
        if !self.is_idle() {
            let timer = self.timer;
            timer.run(|| self.tick()).await;
        }
        self.take_finished()
    }

    /// Returns the outcomes finalized since the last call.
    pub fn take_finished(&mut self) -> Vec<JobOutcome> {
        std::mem::take(&mut self.finished)
    }

    /// Returns true if no job is tracked.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    /// Returns the kinds of the tracked jobs.
    #[must_use]
    pub fn active_kinds(&self) -> Vec<JobKind> {
        self.active.iter().map(|j| j.runner.kind().clone()).collect()
    }

    /// Returns the registry jobs are started against.
    #[must_use]
    pub const fn registry(&self) -> &ExclusionRegistry {
        &self.registry
    }

    /// Returns the log sink, if configured.
    #[must_use]
    pub const fn log_sink(&self) -> Option<&LogSink> {
        self.sink.as_ref()
    }

    /// Returns the view.
    #[must_use]
    pub const fn view(&self) -> &V {
        &self.view
    }

    /// Returns the view mutably.
    pub const fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Consumes the bridge, returning its view.
    #[must_use]
    pub fn into_view(self) -> V {
        self.view
    }

    fn reject(&mut self, err: JobError) -> JobError {
        tracing::warn!(error = %err, "Job not started");
        self.view.warn(&err.to_string());
        err
    }
}
