//! Benchmark utilities for reconbridge.
//!
//! Generates synthetic tool logs shaped like COLMAP output, so log scraping
//! can be measured without running the tools.

use std::fmt::Write as _;

/// Shape of a synthetic log.
#[derive(Debug, Clone, Copy)]
pub struct LogShape {
    /// Number of images the fake tool processes.
    pub images: u64,
    /// Noise lines printed between two progress lines.
    pub noise_lines: usize,
    /// Images per phase; a phase header is printed before each group.
    pub images_per_phase: u64,
}

impl Default for LogShape {
    fn default() -> Self {
        Self {
            images: 500,
            noise_lines: 6,
            images_per_phase: 100,
        }
    }
}

/// Renders a log of `shape`, e.g.
///
/// ```text
/// ==============================================================================
/// Feature extraction
/// ==============================================================================
/// Processed file [1/500]
///   Name:            0001.tiff
/// ```
#[must_use]
pub fn synthetic_log(shape: LogShape) -> String {
    let rule = "=".repeat(78);
    let mut log = String::new();

    for i in 1..=shape.images {
        if shape.images_per_phase > 0 && (i - 1) % shape.images_per_phase == 0 {
            let _ = writeln!(log, "{rule}\nPhase {}\n{rule}", (i - 1) / shape.images_per_phase + 1);
        }
        let _ = writeln!(log, "Processed file [{i}/{}]", shape.images);
        for n in 0..shape.noise_lines {
            let _ = writeln!(log, "  Name:            {i:04}.tiff  detail line {n} with 2048 features");
        }
    }
    log
}

/// Splits `bytes` into chunks of `size`, the way a poller sees a growing file.
#[must_use]
pub fn chunked(bytes: &[u8], size: usize) -> Vec<&[u8]> {
    bytes.chunks(size.max(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconbridge_jobs::{LogPatterns, LogTailer};
    use std::path::PathBuf;

    #[test]
    fn test_synthetic_log_ends_at_total() {
        let log = synthetic_log(LogShape {
            images: 10,
            noise_lines: 2,
            images_per_phase: 4,
        });

        let outcome = LogPatterns::default().scan(log.as_bytes());
        assert_eq!(outcome.progress, Some((10, 10)));
        assert_eq!(log.matches("Phase ").count(), 3);
    }

    #[test]
    fn test_chunked_feed_reaches_total() {
        let log = synthetic_log(LogShape::default());
        let mut tailer = LogTailer::new(PathBuf::from("unused.log"), LogPatterns::default());

        let mut last = None;
        for chunk in chunked(log.as_bytes(), 333) {
            if let Some(progress) = tailer.feed(chunk).progress {
                last = Some(progress);
            }
        }
        assert_eq!(last, Some((500, 500)));
    }
}
