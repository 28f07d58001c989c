//! One invocation of a job, from exclusion to finalization.

use crate::definition::{JobContext, JobDefinition};
use crate::progress::{LogSink, ProgressChannel, ProgressReporter, ProgressSource};
use crate::registry::{ExclusionRegistry, KindLease};
use crate::status::{JobSnapshot, JobStatus, StatusCell};
use crate::subprocess::SubprocessError;
use crate::{BoxError, JobError, JobKind, Result};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use uuid::Uuid;

/// Unique identifier for a job invocation.
pub type JobId = Uuid;

/// Result of one [`JobRunner::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    /// False once the job has reached a terminal status.
    pub keep_polling: bool,
    /// The status record as of this poll.
    pub snapshot: JobSnapshot,
}

/// What is left of a job after it was finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Identifier of the invocation.
    pub id: JobId,
    /// Kind of the job.
    pub kind: JobKind,
    /// Title of the job.
    pub label: String,
    /// Terminal status the work ended with.
    pub status: JobStatus,
    /// Error the work failed with.
    pub error: Option<JobError>,
    /// Last progress count.
    pub current: u64,
    /// Last progress total.
    pub total: u64,
    /// Last phase label.
    pub message: String,
    /// When the work was started.
    pub started_at: DateTime<Utc>,
    /// When the job was finalized.
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    /// Returns true if the work succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    /// Returns the elapsed time between start and finalization.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Outcome of a job whose work never started.
    pub(crate) fn not_started(kind: JobKind, label: String, error: JobError) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            message: label.clone(),
            label,
            status: JobStatus::Failed,
            error: Some(error),
            current: 0,
            total: 0,
            started_at: now,
            finished_at: now,
        }
    }
}

/// Orchestrates a single job: holds its exclusion lease, owns its progress
/// source and exposes its status to the poller.
///
/// A runner only exists once its work is running. Rejected starts and
/// preparation failures are reported by [`JobRunner::start`] returning an
/// error, with the kind already released.
#[derive(Debug)]
pub struct JobRunner {
    id: JobId,
    kind: JobKind,
    label: String,
    cell: Arc<StatusCell>,
    source: ProgressSource,
    lease: Option<KindLease>,
    worker: Option<JoinHandle<()>>,
    started_at: DateTime<Utc>,
}

impl JobRunner {
    /// Acquires the job's kind, prepares it on the calling thread and spawns
    /// its work on a new background thread.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::AlreadyRunning`] if the kind is busy,
    /// [`JobError::Preparation`] if preparation fails or the job needs a log
    /// sink that was not supplied, and [`JobError::Execution`] if the thread
    /// could not be spawned. The kind is never left busy on error.
    pub fn start<D>(
        definition: &D,
        registry: &ExclusionRegistry,
        sink: Option<&LogSink>,
    ) -> Result<Self>
    where
        D: JobDefinition + ?Sized + 'static,
    {
        let kind = definition.kind();
        let label = definition.label();

        let lease = registry
            .lease(kind.clone())
            .ok_or_else(|| JobError::AlreadyRunning { kind: kind.clone() })?;

        let source = match (definition.progress_channel(), sink) {
            (ProgressChannel::Callback, _) => ProgressSource::Callback,
            (ProgressChannel::LogTail(patterns), Some(sink)) => {
                ProgressSource::LogTail(sink.tailer(patterns))
            }
            (ProgressChannel::LogTail(_), None) => {
                return Err(JobError::Preparation(format!(
                    "'{kind}' reports progress through the log sink, but none is configured"
                )));
            }
        };

        let context = JobContext::new(&kind, sink);
        let args = definition.prepare(&context).map_err(|e| {
            tracing::warn!(%kind, error = %e, "Job preparation failed");
            JobError::Preparation(e.to_string())
        })?;

        let id = Uuid::new_v4();
        let cell = Arc::new(StatusCell::new());
        cell.set_message(label.clone());
        // Running must be visible before the worker can write a terminal status.
        cell.mark_running();

        let started_at = Utc::now();
        let reporter = ProgressReporter::new(Arc::clone(&cell));
        let worker_cell = Arc::clone(&cell);
        let spawned = std::thread::Builder::new()
            .name(format!("job-{kind}"))
            .spawn(move || {
                let result = run_work::<D>(args, &reporter);
                worker_cell.finish(result);
            });

        let worker = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                let error = JobError::execution(format!("Failed to spawn worker thread: {e}"));
                cell.finish(Err(error.clone()));
                return Err(error);
            }
        };

        tracing::info!(%id, %kind, %label, "Job started");

        Ok(Self {
            id,
            kind,
            label,
            cell,
            source,
            lease: Some(lease),
            worker: Some(worker),
            started_at,
        })
    }

    /// Returns the invocation identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the job kind.
    #[must_use]
    pub const fn kind(&self) -> &JobKind {
        &self.kind
    }

    /// Returns the job title.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns when the work was started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the current status record.
    #[must_use]
    pub fn snapshot(&self) -> JobSnapshot {
        self.cell.read()
    }

    /// Drives the job's progress source and reads its status.
    ///
    /// Must be called from the polling thread only.
    pub fn poll(&mut self) -> Poll {
        let was_terminal = self.cell.status().is_terminal();
        self.source.poll(&self.cell);
        let mut snapshot = self.cell.read();

        // Output written just before the terminal status may have landed after
        // the tail above; drain it once more so the last progress is kept.
        if snapshot.status.is_terminal() && !was_terminal {
            self.source.poll(&self.cell);
            snapshot = self.cell.read();
        }

        Poll {
            keep_polling: !snapshot.status.is_terminal(),
            snapshot,
        }
    }

    /// Moves a terminal job to `Finalized`, releasing its kind.
    ///
    /// # Errors
    ///
    /// Returns the runner unchanged if its work has not finished yet.
    pub fn finalize(mut self) -> std::result::Result<JobOutcome, Self> {
        if !self.cell.status().is_terminal() {
            return Err(self);
        }

        let snapshot = self.cell.read();
        self.cell.mark_finalized();
        self.source = ProgressSource::Callback;
        drop(self.lease.take());

        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                if worker.join().is_err() {
                    tracing::warn!(kind = %self.kind, "Job worker panicked after finishing");
                }
            } else {
                // Only the worker's own teardown is left; let it exit on its own.
                drop(worker);
            }
        }

        let outcome = JobOutcome {
            id: self.id,
            kind: self.kind.clone(),
            label: self.label.clone(),
            status: snapshot.status,
            error: snapshot.error,
            current: snapshot.current,
            total: snapshot.total,
            message: snapshot.message,
            started_at: self.started_at,
            finished_at: Utc::now(),
        };

        match &outcome.error {
            None => tracing::info!(id = %outcome.id, kind = %outcome.kind, "Job finished"),
            Some(error) => {
                tracing::error!(id = %outcome.id, kind = %outcome.kind, %error, "Job failed");
            }
        }

        Ok(outcome)
    }
}

fn run_work<D>(args: D::Args, reporter: &ProgressReporter) -> Result<()>
where
    D: JobDefinition + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| D::execute(args, reporter))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(execution_error(&e)),
        Err(payload) => Err(JobError::execution(format!(
            "Job panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn execution_error(error: &BoxError) -> JobError {
    JobError::Execution {
        message: error.to_string(),
        exit_code: error
            .downcast_ref::<SubprocessError>()
            .and_then(SubprocessError::exit_code),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::LogPatterns;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Scripted {
        kind: JobKind,
        steps: u64,
        fail: bool,
    }

    impl JobDefinition for Scripted {
        type Args = (u64, bool);

        fn kind(&self) -> JobKind {
            self.kind.clone()
        }

        fn prepare(&self, _context: &JobContext<'_>) -> std::result::Result<Self::Args, BoxError> {
            Ok((self.steps, self.fail))
        }

        fn execute(
            (steps, fail): Self::Args,
            progress: &ProgressReporter,
        ) -> std::result::Result<(), BoxError> {
            progress.on_phase("Working");
            for i in 1..=steps {
                progress.on_progress(i, steps);
            }
            if fail {
                return Err("out of matches".into());
            }
            Ok(())
        }
    }

    struct Gated {
        release: std::sync::Mutex<Option<mpsc::Receiver<()>>>,
        prepares: AtomicUsize,
    }

    impl Gated {
        fn new(gate: Option<mpsc::Receiver<()>>) -> Self {
            Self {
                release: std::sync::Mutex::new(gate),
                prepares: AtomicUsize::new(0),
            }
        }
    }

    impl JobDefinition for Gated {
        type Args = mpsc::Receiver<()>;

        fn kind(&self) -> JobKind {
            JobKind::from_static("gated")
        }

        fn prepare(&self, _context: &JobContext<'_>) -> std::result::Result<Self::Args, BoxError> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            self.release
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| "gate already used".into())
        }

        fn execute(args: Self::Args, _progress: &ProgressReporter) -> std::result::Result<(), BoxError> {
            args.recv().map_err(|e| e.to_string().into())
        }
    }

    struct Unprepared;

    impl JobDefinition for Unprepared {
        type Args = ();

        fn kind(&self) -> JobKind {
            JobKind::from_static("unprepared")
        }

        fn prepare(&self, _context: &JobContext<'_>) -> std::result::Result<(), BoxError> {
            Err("clip has no frames".into())
        }

        fn execute((): (), _progress: &ProgressReporter) -> std::result::Result<(), BoxError> {
            unreachable!("preparation always fails")
        }
    }

    struct Panicking;

    impl JobDefinition for Panicking {
        type Args = ();

        fn kind(&self) -> JobKind {
            JobKind::from_static("panicking")
        }

        fn prepare(&self, _context: &JobContext<'_>) -> std::result::Result<(), BoxError> {
            Ok(())
        }

        fn execute((): (), _progress: &ProgressReporter) -> std::result::Result<(), BoxError> {
            panic!("bad index");
        }
    }

    struct Tailed;

    impl JobDefinition for Tailed {
        type Args = ();

        fn kind(&self) -> JobKind {
            JobKind::from_static("tailed")
        }

        fn progress_channel(&self) -> ProgressChannel {
            ProgressChannel::LogTail(LogPatterns::default())
        }

        fn prepare(&self, _context: &JobContext<'_>) -> std::result::Result<(), BoxError> {
            Ok(())
        }

        fn execute((): (), _progress: &ProgressReporter) -> std::result::Result<(), BoxError> {
            Ok(())
        }
    }

    struct Stamped {
        report: std::sync::Mutex<Option<mpsc::Sender<DateTime<Utc>>>>,
    }

    impl JobDefinition for Stamped {
        type Args = mpsc::Sender<DateTime<Utc>>;

        fn kind(&self) -> JobKind {
            JobKind::from_static("stamped")
        }

        fn prepare(&self, _context: &JobContext<'_>) -> std::result::Result<Self::Args, BoxError> {
            self.report
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| "already started".into())
        }

        fn execute(args: Self::Args, _progress: &ProgressReporter) -> std::result::Result<(), BoxError> {
            args.send(Utc::now()).map_err(|e| e.to_string().into())
        }
    }

    fn wait_terminal(runner: &mut JobRunner) -> Poll {
        loop {
            let poll = runner.poll();
            if !poll.keep_polling {
                return poll;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_successful_job() {
        let registry = ExclusionRegistry::new();
        let definition = Scripted {
            kind: JobKind::from_static("solve"),
            steps: 5,
            fail: false,
        };

        let mut runner = JobRunner::start(&definition, &registry, None).unwrap();
        assert!(registry.is_busy(runner.kind()));

        let poll = wait_terminal(&mut runner);
        assert_eq!(poll.snapshot.status, JobStatus::Succeeded);
        assert_eq!((poll.snapshot.current, poll.snapshot.total), (5, 5));
        assert!(registry.is_busy(&JobKind::from_static("solve")));

        let outcome = runner.finalize().unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.message, "Working");
        assert!(!registry.is_busy(&JobKind::from_static("solve")));
    }

    #[test]
    fn test_failed_job_keeps_message() {
        let registry = ExclusionRegistry::new();
        let definition = Scripted {
            kind: JobKind::from_static("match-features"),
            steps: 2,
            fail: true,
        };

        let mut runner = JobRunner::start(&definition, &registry, None).unwrap();
        wait_terminal(&mut runner);

        let outcome = runner.finalize().unwrap();
        assert_eq!(outcome.status, JobStatus::Failed);
        assert_eq!(outcome.error, Some(JobError::execution("out of matches")));
        assert!(registry.busy_kinds().is_empty());
    }

    #[test]
    fn test_busy_kind_is_rejected_without_preparing() {
        let registry = ExclusionRegistry::new();
        let (release, gate) = mpsc::channel();
        let first = Gated::new(Some(gate));
        let mut runner = JobRunner::start(&first, &registry, None).unwrap();
        assert_eq!(first.prepares.load(Ordering::SeqCst), 1);

        let second = Gated::new(None);
        let err = JobRunner::start(&second, &registry, None).unwrap_err();
        assert_eq!(
            err,
            JobError::AlreadyRunning {
                kind: JobKind::from_static("gated")
            }
        );
        assert_eq!(second.prepares.load(Ordering::SeqCst), 0);
        assert!(registry.is_busy(&JobKind::from_static("gated")));

        assert!(runner.poll().keep_polling);
        release.send(()).unwrap();
        wait_terminal(&mut runner);
        runner.finalize().unwrap();
        assert!(!registry.is_busy(&JobKind::from_static("gated")));
    }

    #[test]
    fn test_preparation_failure_releases_kind() {
        let registry = ExclusionRegistry::new();

        let err = JobRunner::start(&Unprepared, &registry, None).unwrap_err();
        assert_eq!(err, JobError::Preparation("clip has no frames".to_string()));
        assert!(!registry.is_busy(&JobKind::from_static("unprepared")));
    }

    #[test]
    fn test_panic_marks_job_failed() {
        let registry = ExclusionRegistry::new();

        let mut runner = JobRunner::start(&Panicking, &registry, None).unwrap();
        let poll = wait_terminal(&mut runner);

        assert_eq!(poll.snapshot.status, JobStatus::Failed);
        let error = poll.snapshot.error.unwrap();
        assert_eq!(error.as_str(), "execution");
        assert!(error.to_string().contains("bad index"));
        runner.finalize().unwrap();
    }

    #[test]
    fn test_start_time_precedes_work() {
        let registry = ExclusionRegistry::new();
        let (report, work_started) = mpsc::channel();
        let definition = Stamped {
            report: std::sync::Mutex::new(Some(report)),
        };

        let before = Utc::now();
        let mut runner = JobRunner::start(&definition, &registry, None).unwrap();
        let work_started_at = work_started.recv().unwrap();

        assert!(before <= runner.started_at());
        assert!(runner.started_at() <= work_started_at);

        wait_terminal(&mut runner);
        let outcome = runner.finalize().unwrap();
        assert!(outcome.elapsed() >= work_started_at - outcome.started_at);
    }

    #[test]
    fn test_finalize_refuses_running_job() {
        let registry = ExclusionRegistry::new();
        let (release, gate) = mpsc::channel();
        let definition = Gated::new(Some(gate));

        let runner = JobRunner::start(&definition, &registry, None).unwrap();
        let mut runner = runner.finalize().unwrap_err();
        assert_eq!(runner.snapshot().status, JobStatus::Running);
        assert!(registry.is_busy(runner.kind()));

        release.send(()).unwrap();
        wait_terminal(&mut runner);
        assert_eq!(runner.finalize().unwrap().status, JobStatus::Succeeded);
    }

    #[test]
    fn test_log_tail_requires_sink() {
        let registry = ExclusionRegistry::new();

        let err = JobRunner::start(&Tailed, &registry, None).unwrap_err();
        assert_eq!(err.as_str(), "preparation");
        assert!(registry.busy_kinds().is_empty());

        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::create(temp_dir.path().join("sink.log")).unwrap();
        let mut runner = JobRunner::start(&Tailed, &registry, Some(&sink)).unwrap();
        wait_terminal(&mut runner);
        runner.finalize().unwrap();
    }

    #[test]
    fn test_subprocess_exit_code_is_preserved() {
        let error: BoxError = Box::new(SubprocessError::Exited {
            program: "colmap".into(),
            code: Some(2),
        });

        let job_error = execution_error(&error);
        assert_eq!(job_error.exit_code(), Some(2));
        assert_eq!(job_error.to_string(), "Execution failed: 'colmap' exited with code 2");
    }
}
