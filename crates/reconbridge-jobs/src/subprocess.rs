//! Running external tools as job work.
//!
//! A tool either writes into the shared log sink, where a
//! [`LogTailer`](crate::LogTailer) picks its progress up, or has one of its
//! own output streams read line by line on the job's background thread.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use thiserror::Error;

/// Errors from running an external tool.
#[derive(Error, Debug)]
pub enum SubprocessError {
    /// The process could not be started.
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        /// The program that could not be started.
        program: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Reading the process's output failed.
    #[error("Failed to read output of '{program}': {source}")]
    Read {
        /// The program being read.
        program: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Waiting for the process failed.
    #[error("Failed to wait for '{program}': {source}")]
    Wait {
        /// The program being waited on.
        program: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("'{program}' exited with {}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    Exited {
        /// The program that failed.
        program: PathBuf,
        /// The exit code, absent if the process was killed by a signal.
        code: Option<i32>,
    },
}

impl SubprocessError {
    /// Returns the exit code of an unsuccessful exit.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited { code, .. } => *code,
            _ => None,
        }
    }
}

/// Which output stream of a child to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// A command line for an external tool.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Creates a command for `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Sets an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Sets the child's working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Returns the program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the arguments.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Renders the command line for logs.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the tool with stdout and stderr appended to `log`, and waits.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be started or exits unsuccessfully.
    pub fn run_logged(&self, log: File) -> Result<(), SubprocessError> {
        let log_stderr = log.try_clone().map_err(|e| self.spawn_error(e))?;

        tracing::info!(command = %self.display(), "Running tool");
        let status = self
            .command()
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(log_stderr)
            .status()
            .map_err(|e| self.spawn_error(e))?;

        self.check(status)
    }

    /// Runs the tool, handing each line of `stream` to `on_line`, and waits.
    ///
    /// The other stream goes to `other`. Lines are decoded lossily and passed
    /// without their line terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be started, its output cannot be
    /// read, or it exits unsuccessfully.
    pub fn run_streaming<F>(
        &self,
        stream: OutputStream,
        other: Stdio,
        mut on_line: F,
    ) -> Result<(), SubprocessError>
    where
        F: FnMut(&str),
    {
        let mut command = self.command();
        command.stdin(Stdio::null());
        match stream {
            OutputStream::Stdout => command.stdout(Stdio::piped()).stderr(other),
            OutputStream::Stderr => command.stderr(Stdio::piped()).stdout(other),
        };

        tracing::info!(command = %self.display(), ?stream, "Running tool");
        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;

        let pipe: Option<Box<dyn Read>> = match stream {
            OutputStream::Stdout => child.stdout.take().map(|p| Box::new(p) as Box<dyn Read>),
            OutputStream::Stderr => child.stderr.take().map(|p| Box::new(p) as Box<dyn Read>),
        };

        if let Some(pipe) = pipe {
            if let Err(e) = read_lines(pipe, &mut on_line) {
                reap(&mut child);
                return Err(SubprocessError::Read {
                    program: self.program.clone(),
                    source: e,
                });
            }
        }

        let status = child.wait().map_err(|e| SubprocessError::Wait {
            program: self.program.clone(),
            source: e,
        })?;

        self.check(status)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.envs(self.envs.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }

    fn check(&self, status: ExitStatus) -> Result<(), SubprocessError> {
        if status.success() {
            return Ok(());
        }
        Err(SubprocessError::Exited {
            program: self.program.clone(),
            code: status.code(),
        })
    }

    fn spawn_error(&self, source: std::io::Error) -> SubprocessError {
        SubprocessError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

fn read_lines(pipe: Box<dyn Read>, on_line: &mut impl FnMut(&str)) -> std::io::Result<()> {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\r', '\n']));
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::LogSink;
    use tempfile::TempDir;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_display() {
        let command = ToolCommand::new("/usr/bin/colmap")
            .arg("mapper")
            .args(["--database_path", "db.db"]);
        assert_eq!(command.display(), "/usr/bin/colmap mapper --database_path db.db");
        assert_eq!(command.arguments().len(), 3);
    }

    #[test]
    fn test_run_logged_appends_both_streams() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::create(temp_dir.path().join("sink.log")).unwrap();
        sink.append_line("before").unwrap();

        sh("echo 'Processed file [1/2]'; echo warning 1>&2")
            .run_logged(sink.writer().unwrap())
            .unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert!(content.starts_with("before\n"));
        assert!(content.contains("Processed file [1/2]\n"));
        assert!(content.contains("warning\n"));
    }

    #[test]
    fn test_exit_code_is_captured() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::create(temp_dir.path().join("sink.log")).unwrap();

        let err = sh("exit 3").run_logged(sink.writer().unwrap()).unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(err.to_string(), "'sh' exited with code 3");
    }

    #[test]
    fn test_missing_program() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::create(temp_dir.path().join("sink.log")).unwrap();

        let err = ToolCommand::new(temp_dir.path().join("no-such-tool"))
            .run_logged(sink.writer().unwrap())
            .unwrap_err();
        assert!(matches!(err, SubprocessError::Spawn { .. }));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_run_streaming_reads_chosen_stream() {
        let mut lines = Vec::new();
        sh("echo out; printf 'one\\r\\ntwo\\n' 1>&2")
            .run_streaming(OutputStream::Stderr, Stdio::null(), |line| {
                lines.push(line.to_string());
            })
            .unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_run_streaming_env_and_failure() {
        let mut lines = Vec::new();
        let err = sh("echo \"$STAGE\"; exit 1")
            .env("STAGE", "mapper")
            .run_streaming(OutputStream::Stdout, Stdio::null(), |line| {
                lines.push(line.to_string());
            })
            .unwrap_err();

        assert_eq!(lines, vec!["mapper"]);
        assert_eq!(err.exit_code(), Some(1));
    }
}
