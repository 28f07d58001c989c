//! Pattern pair used to scrape progress out of free-text logs.

use regex::bytes::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Default progress pattern: two integers inside brackets, `[current/total]`.
///
/// The closing `]` or `,` must be present, so a line torn at `[3/1` does not
/// match until the rest of it arrives.
pub const DEFAULT_PROGRESS_PATTERN: &str = r"\[(\d+)\s*/\s*(\d+)[\],]";

/// Default phase pattern: a name line framed by two rule lines of `=` or `-`.
pub const DEFAULT_PHASE_PATTERN: &str =
    r"(?:={6,}|-{6,})[ \t]*\r?\n[ \t]*([^\r\n=-][^\r\n]*?)[ \t]*\r?\n[ \t]*(?:={6,}|-{6,})";

static DEFAULT_PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_PROGRESS_PATTERN).expect("valid regex"));

static DEFAULT_PHASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_PHASE_PATTERN).expect("valid regex"));

/// Errors building a [`LogPatterns`].
#[derive(Error, Debug)]
pub enum PatternError {
    /// The pattern is not a valid regular expression.
    #[error("Invalid pattern: {0}")]
    Invalid(#[from] regex::Error),

    /// The pattern has fewer capture groups than required.
    #[error("Pattern '{pattern}' needs {expected} capture group(s)")]
    MissingGroups {
        /// The offending pattern.
        pattern: String,
        /// Number of groups required.
        expected: usize,
    },
}

/// Result of scanning a buffer with a [`LogPatterns`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Last `(current, total)` pair found.
    pub progress: Option<(u64, u64)>,
    /// Last phase name found.
    pub phase: Option<String>,
    /// Number of leading bytes that can be discarded.
    pub consumed: usize,
}

/// A progress-fraction matcher and a phase-header matcher.
#[derive(Debug, Clone)]
pub struct LogPatterns {
    progress: Regex,
    phase: Regex,
}

impl Default for LogPatterns {
    fn default() -> Self {
        Self {
            progress: DEFAULT_PROGRESS.clone(),
            phase: DEFAULT_PHASE.clone(),
        }
    }
}

impl LogPatterns {
    /// Builds a pattern pair.
    ///
    /// `progress` needs two capture groups (current, total) and `phase` one
    /// (the phase name).
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not compile or lacks groups.
    pub fn new(progress: &str, phase: &str) -> Result<Self, PatternError> {
        Ok(Self {
            progress: compile(progress, 2)?,
            phase: compile(phase, 1)?,
        })
    }

    /// Replaces the progress pattern, keeping the phase pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile or lacks groups.
    pub fn with_progress(self, progress: &str) -> Result<Self, PatternError> {
        Ok(Self {
            progress: compile(progress, 2)?,
            ..self
        })
    }

    /// Scans `buf` for the latest progress fraction and phase name.
    ///
    /// A progress match consumes the whole buffer. A phase-only match
    /// consumes up to the end of the last phase header. No match consumes
    /// nothing.
    #[must_use]
    pub fn scan(&self, buf: &[u8]) -> ScanOutcome {
        let progress = self
            .progress
            .captures_iter(buf)
            .filter_map(|caps| {
                let current = parse_u64(caps.get(1)?.as_bytes())?;
                let total = parse_u64(caps.get(2)?.as_bytes())?;
                Some((current, total))
            })
            .last();

        let mut phase_end = 0;
        let phase = self
            .phase
            .captures_iter(buf)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                phase_end = whole.end();
                Some(String::from_utf8_lossy(name.as_bytes()).trim().to_string())
            })
            .last();

        let consumed = if progress.is_some() {
            buf.len()
        } else {
            phase_end
        };

        ScanOutcome {
            progress,
            phase,
            consumed,
        }
    }
}

fn compile(pattern: &str, groups: usize) -> Result<Regex, PatternError> {
    let regex = Regex::new(pattern)?;
    // captures_len counts the implicit whole-match group
    if regex.captures_len() < groups + 1 {
        return Err(PatternError::MissingGroups {
            pattern: pattern.to_string(),
            expected: groups,
        });
    }
    Ok(regex)
}

fn parse_u64(digits: &[u8]) -> Option<u64> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}
