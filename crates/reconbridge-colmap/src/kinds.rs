//! Exclusion kinds of the pipeline stages.

use reconbridge_jobs::JobKind;

/// Feature extraction.
pub const EXTRACT_FEATURES: JobKind = JobKind::from_static("extract-features");

/// Feature matching.
pub const MATCH_FEATURES: JobKind = JobKind::from_static("match-features");

/// Sparse reconstruction, with either solver.
pub const SOLVE: JobKind = JobKind::from_static("solve");
