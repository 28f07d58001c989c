//! Global options, logging setup and the per-invocation session.

use anyhow::{Context, Result, bail};
use clap::Args;
use directories::ProjectDirs;
use reconbridge_colmap::{PipelineSettings, Toolchain};
use reconbridge_jobs::{ExclusionRegistry, LogSink, RepeatingTimer};
use reconbridge_project::{Project, ProjectLayout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the tracing filter.
const LOG_FILTER_ENV: &str = "RECONBRIDGE_LOG";

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub(crate) struct GlobalArgs {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(crate) verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    pub(crate) quiet: bool,

    /// Project directory
    #[arg(long, env = "RECONBRIDGE_PROJECT", global = true, conflicts_with = "clip")]
    pub(crate) project: Option<PathBuf>,

    /// Source clip; the project lives in `reconbridge/<clip name>` next to it
    #[arg(long, global = true)]
    pub(crate) clip: Option<PathBuf>,

    /// Path to the colmap binary (defaults to $RECONBRIDGE_COLMAP, then PATH)
    #[arg(long, global = true)]
    pub(crate) colmap_bin: Option<PathBuf>,

    /// Path to the glomap binary (defaults to $RECONBRIDGE_GLOMAP, then PATH)
    #[arg(long, global = true)]
    pub(crate) glomap_bin: Option<PathBuf>,

    /// Shared log file tool output is written to
    #[arg(long, env = "RECONBRIDGE_LOG_SINK", global = true)]
    pub(crate) log_sink: Option<PathBuf>,

    /// Progress polling period in milliseconds
    #[arg(long, default_value_t = 100, global = true)]
    pub(crate) poll_ms: u64,
}

impl GlobalArgs {
    /// Resolves the project directory from `--project` or `--clip`.
    pub(crate) fn layout(&self) -> Result<ProjectLayout> {
        match (&self.project, &self.clip) {
            (Some(root), _) => Ok(ProjectLayout::new(root)),
            (None, Some(clip)) => ProjectLayout::for_clip(clip)
                .with_context(|| format!("Invalid clip: {}", clip.display())),
            (None, None) => bail!("No project given; pass --project <dir> or --clip <file>"),
        }
    }

    pub(crate) fn poll_period(&self) -> Duration {
        RepeatingTimer::new(Duration::from_millis(self.poll_ms)).period()
    }

    pub(crate) fn toolchain(&self) -> Toolchain {
        Toolchain::new(self.colmap_bin.clone(), self.glomap_bin.clone())
    }
}

/// Installs the stderr tracing subscriber.
///
/// `RECONBRIDGE_LOG` (or `RUST_LOG`) wins over the level derived from the
/// verbosity flags.
pub(crate) fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "reconbridge=info,warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Returns the application data directory.
pub(crate) fn data_dir() -> PathBuf {
    ProjectDirs::from("", "", "reconbridge")
        .map_or_else(dirs_fallback, |dirs| dirs.data_dir().to_path_buf())
}

fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".reconbridge")
}

/// Returns a fresh log sink path under `<data_dir>/logs`.
pub(crate) fn session_log_path(data_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    data_dir
        .join("logs")
        .join(format!("session-{stamp}-{}.log", std::process::id()))
}

/// Everything a job-running command needs, created once per invocation.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) project: Project,
    pub(crate) registry: ExclusionRegistry,
    pub(crate) sink: LogSink,
    pub(crate) toolchain: Toolchain,
    pub(crate) settings: PipelineSettings,
    pub(crate) poll_period: Duration,
    pub(crate) quiet: bool,
}

impl Session {
    /// Opens the project, its settings and the shared log sink.
    pub(crate) fn open(args: &GlobalArgs) -> Result<Self> {
        let project = open_project(args)?;

        let settings = PipelineSettings::store(project.layout())
            .load()
            .context("Failed to load pipeline settings")?;

        let sink_path = args
            .log_sink
            .clone()
            .unwrap_or_else(|| session_log_path(&data_dir()));
        let sink = LogSink::create(&sink_path)
            .with_context(|| format!("Failed to open log sink {}", sink_path.display()))?;
        tracing::debug!(path = %sink.path().display(), "Log sink ready");

        Ok(Self {
            project,
            registry: ExclusionRegistry::new(),
            sink,
            toolchain: args.toolchain(),
            settings,
            poll_period: args.poll_period(),
            quiet: args.quiet,
        })
    }
}

/// Opens the project named by the global options.
pub(crate) fn open_project(args: &GlobalArgs) -> Result<Project> {
    let layout = args.layout()?;
    Project::open(layout.clone())
        .with_context(|| format!("Failed to open project {}", layout.root().display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsStr;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        global: GlobalArgs,
    }

    #[test]
    fn test_layout_from_project_or_clip() {
        let cli = TestCli::parse_from(["reconbridge", "--project", "/tmp/shot"]);
        assert_eq!(cli.global.layout().unwrap().root(), Path::new("/tmp/shot"));

        let cli = TestCli::parse_from(["reconbridge", "--clip", "/footage/take3.mov"]);
        assert_eq!(
            cli.global.layout().unwrap().root(),
            Path::new("/footage/reconbridge/take3.mov")
        );
    }

    #[test]
    fn test_poll_period_is_clamped() {
        let cli = TestCli::parse_from(["reconbridge", "--poll-ms", "0"]);
        assert_eq!(cli.global.poll_period(), RepeatingTimer::MIN_PERIOD);

        let cli = TestCli::parse_from(["reconbridge"]);
        assert_eq!(cli.global.poll_period(), RepeatingTimer::DEFAULT_PERIOD);
    }

    #[test]
    fn test_session_log_path() {
        let path = session_log_path(Path::new("/data"));
        assert!(path.starts_with("/data/logs"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("session-"));
        assert!(name.ends_with(&format!("-{}.log", std::process::id())));
    }

    #[test]
    fn test_session_opens_project_and_sink() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path().join("shot");
        let sink = temp_dir.path().join("session.log");
        let cli = TestCli::parse_from([
            OsStr::new("reconbridge"),
            OsStr::new("--project"),
            root.as_os_str(),
            OsStr::new("--log-sink"),
            sink.as_os_str(),
        ]);

        let session = Session::open(&cli.global).unwrap();
        assert!(session.project.layout().frames_dir().is_dir());
        assert!(sink.exists());
        assert_eq!(session.settings, PipelineSettings::default());
    }
}
