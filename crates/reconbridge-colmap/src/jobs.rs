//! The pipeline stages as job definitions.
//!
//! Feature extraction, matching and the global mapper write their log into
//! the shared sink, where progress is scraped from. The incremental mapper's
//! stderr is read line by line instead, since its registration messages give
//! a much finer progress signal.

use crate::kinds::{EXTRACT_FEATURES, MATCH_FEATURES, SOLVE};
use crate::options::{ExtractOptions, GlomapOptions, MapperOptions, MatchOptions};
use reconbridge_jobs::progress::LogPatterns;
use reconbridge_jobs::{
    BoxError, JobContext, JobDefinition, JobKind, OutputStream, ProgressChannel,
    ProgressReporter, ToolCommand,
};
use reconbridge_project::ProjectLayout;
use regex::Regex;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

/// Progress lines of the COLMAP matchers, e.g. `Matching block [1/4, 2/4]`.
pub const MATCH_PROGRESS_PATTERN: &str = r"Matching \w+ \[(\d+)\s*/\s*(\d+)[\],]";

static MATCH_PATTERNS: LazyLock<LogPatterns> = LazyLock::new(|| {
    LogPatterns::default()
        .with_progress(MATCH_PROGRESS_PATTERN)
        .expect("valid regex")
});

static REGISTERING_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Registering image #\d+ \((\d+)\)").expect("valid regex"));

/// What a line of incremental mapper output says about progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MapperEvent {
    /// A new model is being started from an initial image pair.
    Initializing,
    /// The given number of images is registered in the current model.
    Registered(u64),
}

pub(crate) fn parse_mapper_line(line: &str) -> Option<MapperEvent> {
    if line.contains("Initializing with image pair") {
        return Some(MapperEvent::Initializing);
    }
    REGISTERING_IMAGE
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
        .map(MapperEvent::Registered)
}

/// A tool command whose output goes into the shared log sink.
#[derive(Debug)]
pub struct LoggedCommand {
    command: ToolCommand,
    log: File,
}

impl LoggedCommand {
    fn prepare(context: &JobContext<'_>, command: ToolCommand) -> Result<Self, BoxError> {
        let sink = context
            .log_sink()
            .ok_or_else(|| format!("'{}' needs a log sink", context.kind()))?;
        sink.append_line(&format!("$ {}", command.display()))?;
        Ok(Self {
            command,
            log: sink.writer()?,
        })
    }

    fn run(self) -> Result<(), BoxError> {
        self.command.run_logged(self.log)?;
        Ok(())
    }
}

fn colmap_command(colmap: &Path, subcommand: &str) -> ToolCommand {
    ToolCommand::new(colmap)
        .arg(subcommand)
        .env("GLOG_logtostderr", "1")
}

fn require_frames(layout: &ProjectLayout) -> Result<u64, BoxError> {
    layout.ensure()?;
    let frames = layout.frame_count()?;
    if frames == 0 {
        return Err(format!(
            "No frames in '{}'; split the clip into an image sequence first",
            layout.frames_dir().display()
        )
        .into());
    }
    Ok(frames as u64)
}

fn require_database(layout: &ProjectLayout) -> Result<(), BoxError> {
    if !layout.database_path().exists() {
        return Err(format!(
            "No feature database at '{}'; extract features first",
            layout.database_path().display()
        )
        .into());
    }
    Ok(())
}

/// Detects and describes features in every frame.
#[derive(Debug, Clone)]
pub struct ExtractFeatures {
    colmap: PathBuf,
    layout: ProjectLayout,
    options: ExtractOptions,
}

impl ExtractFeatures {
    /// Creates the stage for the project at `layout`.
    #[must_use]
    pub const fn new(colmap: PathBuf, layout: ProjectLayout, options: ExtractOptions) -> Self {
        Self {
            colmap,
            layout,
            options,
        }
    }

    /// Returns the full command line.
    #[must_use]
    pub fn command(&self) -> ToolCommand {
        colmap_command(&self.colmap, "feature_extractor")
            .arg("--database_path")
            .arg(self.layout.database_path())
            .arg("--image_path")
            .arg(self.layout.frames_dir())
            .args(self.options.arguments())
    }
}

impl JobDefinition for ExtractFeatures {
    type Args = LoggedCommand;

    fn kind(&self) -> JobKind {
        EXTRACT_FEATURES
    }

    fn label(&self) -> String {
        "Extract features".to_string()
    }

    fn progress_channel(&self) -> ProgressChannel {
        ProgressChannel::LogTail(LogPatterns::default())
    }

    fn prepare(&self, context: &JobContext<'_>) -> Result<LoggedCommand, BoxError> {
        require_frames(&self.layout)?;
        LoggedCommand::prepare(context, self.command())
    }

    fn execute(args: LoggedCommand, _progress: &ProgressReporter) -> Result<(), BoxError> {
        args.run()
    }
}

/// Matches features between frames and verifies the pairs.
#[derive(Debug, Clone)]
pub struct MatchFeatures {
    colmap: PathBuf,
    layout: ProjectLayout,
    options: MatchOptions,
}

impl MatchFeatures {
    /// Creates the stage for the project at `layout`.
    #[must_use]
    pub const fn new(colmap: PathBuf, layout: ProjectLayout, options: MatchOptions) -> Self {
        Self {
            colmap,
            layout,
            options,
        }
    }

    /// Returns the full command line.
    #[must_use]
    pub fn command(&self) -> ToolCommand {
        colmap_command(&self.colmap, self.options.matcher.subcommand())
            .arg("--database_path")
            .arg(self.layout.database_path())
            .args(self.options.arguments())
    }
}

impl JobDefinition for MatchFeatures {
    type Args = LoggedCommand;

    fn kind(&self) -> JobKind {
        MATCH_FEATURES
    }

    fn label(&self) -> String {
        format!("Match features ({})", self.options.matcher)
    }

    fn progress_channel(&self) -> ProgressChannel {
        ProgressChannel::LogTail(MATCH_PATTERNS.clone())
    }

    fn prepare(&self, context: &JobContext<'_>) -> Result<LoggedCommand, BoxError> {
        require_database(&self.layout)?;
        LoggedCommand::prepare(context, self.command())
    }

    fn execute(args: LoggedCommand, _progress: &ProgressReporter) -> Result<(), BoxError> {
        args.run()
    }
}

/// Arguments of the incremental mapper.
#[derive(Debug)]
pub struct SolveArgs {
    command: ToolCommand,
    total: u64,
    log: Option<File>,
}

/// Reconstructs cameras and points with the incremental mapper.
#[derive(Debug, Clone)]
pub struct Solve {
    colmap: PathBuf,
    layout: ProjectLayout,
    options: MapperOptions,
}

impl Solve {
    /// Creates the stage for the project at `layout`.
    #[must_use]
    pub const fn new(colmap: PathBuf, layout: ProjectLayout, options: MapperOptions) -> Self {
        Self {
            colmap,
            layout,
            options,
        }
    }

    /// Returns the full command line.
    #[must_use]
    pub fn command(&self) -> ToolCommand {
        colmap_command(&self.colmap, "mapper")
            .arg("--database_path")
            .arg(self.layout.database_path())
            .arg("--image_path")
            .arg(self.layout.frames_dir())
            .arg("--output_path")
            .arg(self.layout.reconstruction_dir())
            .args(self.options.arguments())
    }
}

impl JobDefinition for Solve {
    type Args = SolveArgs;

    fn kind(&self) -> JobKind {
        SOLVE
    }

    fn label(&self) -> String {
        "Solve".to_string()
    }

    fn prepare(&self, context: &JobContext<'_>) -> Result<SolveArgs, BoxError> {
        let total = require_frames(&self.layout)?;
        require_database(&self.layout)?;

        let command = self.command();
        let log = match context.log_sink() {
            Some(sink) => {
                sink.append_line(&format!("$ {}", command.display()))?;
                Some(sink.writer()?)
            }
            None => None,
        };

        Ok(SolveArgs {
            command,
            total,
            log,
        })
    }

    fn execute(args: SolveArgs, progress: &ProgressReporter) -> Result<(), BoxError> {
        let SolveArgs {
            command,
            total,
            mut log,
        } = args;

        let stdout = match &log {
            Some(file) => Stdio::from(file.try_clone()?),
            None => Stdio::null(),
        };

        progress.on_phase("Incremental mapping");
        progress.on_progress(0, total);

        command.run_streaming(OutputStream::Stderr, stdout, |line| {
            if let Some(file) = log.as_mut() {
                if let Err(e) = writeln!(file, "{line}") {
                    tracing::debug!(error = %e, "Failed to copy mapper output to log sink");
                }
            }

            match parse_mapper_line(line) {
                Some(MapperEvent::Initializing) => {
                    progress.on_phase("Initializing with image pair");
                    progress.on_progress(0, total);
                }
                Some(MapperEvent::Registered(count)) => {
                    progress.on_phase("Registering images");
                    progress.on_progress(count.min(total), total);
                }
                None => {}
            }
        })?;

        Ok(())
    }
}

/// Reconstructs cameras and points with the global mapper.
#[derive(Debug, Clone)]
pub struct GlomapSolve {
    glomap: PathBuf,
    layout: ProjectLayout,
    options: GlomapOptions,
}

impl GlomapSolve {
    /// Creates the stage for the project at `layout`.
    #[must_use]
    pub const fn new(glomap: PathBuf, layout: ProjectLayout, options: GlomapOptions) -> Self {
        Self {
            glomap,
            layout,
            options,
        }
    }

    /// Returns the full command line.
    #[must_use]
    pub fn command(&self) -> ToolCommand {
        ToolCommand::new(&self.glomap)
            .arg("mapper")
            .arg("--database_path")
            .arg(self.layout.database_path())
            .arg("--image_path")
            .arg(self.layout.frames_dir())
            .arg("--output_path")
            .arg(self.layout.reconstruction_dir())
            .args(self.options.arguments())
            .env("GLOG_logtostderr", "1")
    }
}

impl JobDefinition for GlomapSolve {
    type Args = LoggedCommand;

    fn kind(&self) -> JobKind {
        SOLVE
    }

    fn label(&self) -> String {
        "Solve with GLOMAP".to_string()
    }

    fn progress_channel(&self) -> ProgressChannel {
        ProgressChannel::LogTail(LogPatterns::default())
    }

    fn prepare(&self, context: &JobContext<'_>) -> Result<LoggedCommand, BoxError> {
        require_frames(&self.layout)?;
        require_database(&self.layout)?;
        LoggedCommand::prepare(context, self.command())
    }

    fn execute(args: LoggedCommand, _progress: &ProgressReporter) -> Result<(), BoxError> {
        args.run()
    }
}
